use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Byte offset of a three-letter code inside the 160-bit currency.
const CODE_OFFSET: usize = 12;

/// A 160-bit currency code.
///
/// All zeros denotes the native asset. Standard three-character codes are
/// stored at bytes 12..15 with every other byte zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Currency([u8; 20]);

impl Currency {
    /// The native currency.
    pub const fn native() -> Self {
        Self([0u8; 20])
    }

    /// Build a standard currency from a three-character ASCII code.
    ///
    /// The native ticker `XRP` is reserved and rejected here.
    pub fn from_code(code: &str) -> Result<Self, TypeError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidCurrency(code.to_string()));
        }
        if code == "XRP" {
            return Err(TypeError::InvalidCurrency(
                "native ticker cannot be issued".into(),
            ));
        }
        let mut raw = [0u8; 20];
        raw[CODE_OFFSET..CODE_OFFSET + 3].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Create from raw bytes.
    pub const fn from_raw(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for the native currency.
    pub fn is_native(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// The three-character code, if this is a standard currency.
    pub fn code(&self) -> Option<&str> {
        let standard = self
            .0
            .iter()
            .enumerate()
            .all(|(i, b)| (CODE_OFFSET..CODE_OFFSET + 3).contains(&i) || *b == 0);
        if !standard || self.is_native() {
            return None;
        }
        std::str::from_utf8(&self.0[CODE_OFFSET..CODE_OFFSET + 3]).ok()
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({self})")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            return write!(f, "XRP");
        }
        match self.code() {
            Some(code) => write!(f, "{code}"),
            None => write!(f, "{}", hex::encode_upper(self.0)),
        }
    }
}

impl FromStr for Currency {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "XRP" {
            return Ok(Self::native());
        }
        if s.len() == 40 {
            let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
            let mut raw = [0u8; 20];
            raw.copy_from_slice(&bytes);
            return Ok(Self(raw));
        }
        Self::from_code(s)
    }
}
