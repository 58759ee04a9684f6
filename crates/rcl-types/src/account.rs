use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Version byte prepended to account ids in their base58 form.
const ACCOUNT_ID_VERSION: u8 = 0;

/// A 160-bit account identifier.
///
/// Derived deterministically from an account's public key, so an account
/// address never needs a persisted secret: re-deriving the keypair from its
/// seed re-derives the address. The human-readable form is base58check with
/// the ripple alphabet, which always starts with `r`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId([u8; 20]);

impl AccountId {
    /// Derive the account id owned by a public key encoding.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"rcl-account-v1:");
        hasher.update(public_key);
        let digest = hasher.finalize();
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest.as_bytes()[..20]);
        Self(id)
    }

    /// Create from raw bytes.
    pub const fn from_raw(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for the all-zero account (never a valid owner).
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Base58check encoding (`r...`).
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check_version(ACCOUNT_ID_VERSION)
            .into_string()
    }

    /// Parse the base58check encoding.
    pub fn from_base58(s: &str) -> Result<Self, TypeError> {
        let decoded = bs58::decode(s)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check(Some(ACCOUNT_ID_VERSION))
            .into_vec()
            .map_err(|e| TypeError::InvalidAccountId(e.to_string()))?;
        let payload = match decoded.len() {
            21 => &decoded[1..],
            20 => &decoded[..],
            actual => {
                return Err(TypeError::InvalidLength {
                    expected: 20,
                    actual,
                })
            }
        };
        let mut id = [0u8; 20];
        id.copy_from_slice(payload);
        Ok(Self(id))
    }

    /// Short identifier for logs (first 8 hex characters).
    pub fn short_id(&self) -> String {
        hex::encode_upper(&self.0[..4])
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short_id())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}
