//! Offer quality: the 64-bit rate that orders offers inside an order book.
//!
//! A book directory key is a 256-bit value whose first 192 bits identify the
//! book (the pair of assets) and whose trailing 64 bits hold the quality in
//! big-endian order, so directory keys of one book sort by rate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, Asset, IouValue};
use crate::error::TypeError;
use crate::hash::Hash256;

/// Offset of the quality bytes inside a book directory key.
const QUALITY_OFFSET: usize = 24;

/// Encoded exchange rate: exponent + 100 in the top byte, mantissa below.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quality(u64);

impl Quality {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The quality stored in the trailing 64 bits of a book directory key.
    pub fn from_book_index(index: &Hash256) -> Self {
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&index.as_bytes()[QUALITY_OFFSET..]);
        Self(u64::from_be_bytes(tail))
    }

    /// Rate `offer_in / offer_out` of an offer. A zero rate (either side
    /// zero) encodes as quality 0.
    pub fn from_amounts(offer_out: &Amount, offer_in: &Amount) -> Result<Self, TypeError> {
        let out_value = offer_out.rate_value()?;
        if out_value.is_zero() {
            return Ok(Self(0));
        }
        Self::from_rate(&offer_in.rate_value()?.checked_div(&out_value)?)
    }

    /// Encode a rate value.
    pub fn from_rate(rate: &IouValue) -> Result<Self, TypeError> {
        if rate.is_zero() {
            return Ok(Self(0));
        }
        if rate.is_negative() {
            return Err(TypeError::InvalidAmount("negative rate".into()));
        }
        let exponent = (rate.exponent() + 100) as u64;
        Ok(Self((exponent << 56) | rate.mantissa()))
    }

    /// Decode back into a rate value.
    pub fn rate(&self) -> Result<IouValue, TypeError> {
        if self.0 == 0 {
            return Ok(IouValue::zero());
        }
        let mantissa = self.0 & 0x00FF_FFFF_FFFF_FFFF;
        let exponent = (self.0 >> 56) as i32 - 100;
        IouValue::new(mantissa, exponent)
    }

    /// Place this quality into the trailing bits of a book base.
    pub fn book_index(&self, base: &Hash256) -> Hash256 {
        let mut bytes = *base.as_bytes();
        bytes[QUALITY_OFFSET..].copy_from_slice(&self.0.to_be_bytes());
        Hash256::from_array(bytes)
    }
}

impl fmt::Debug for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quality({:#018x})", self.0)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key prefix shared by every directory of the book `pays -> gets`, with the
/// quality bits cleared.
pub fn book_base(taker_pays: &Asset, taker_gets: &Asset) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"rcl-book-v1:");
    for asset in [taker_pays, taker_gets] {
        match asset {
            Asset::Native => {
                hasher.update(&[0u8]);
            }
            Asset::Issued { currency, issuer } => {
                hasher.update(&[1u8]);
                hasher.update(currency.as_bytes());
                hasher.update(issuer.as_bytes());
            }
        }
    }
    let mut bytes = *hasher.finalize().as_bytes();
    bytes[QUALITY_OFFSET..].fill(0);
    Hash256::from_array(bytes)
}

/// The first key past every quality of the book containing `index`.
pub fn quality_next(index: &Hash256) -> Hash256 {
    let mut bytes = *index.as_bytes();
    bytes[QUALITY_OFFSET..].fill(0);
    for byte in bytes[..QUALITY_OFFSET].iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            break;
        }
    }
    Hash256::from_array(bytes)
}
