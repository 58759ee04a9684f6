//! Foundation types for the replicated closing ledger (RCL).
//!
//! Every other RCL crate depends on `rcl-types`.
//!
//! # Key Types
//!
//! - [`Hash256`]: 256-bit hash used for node ids, entry keys and ledger hashes
//! - [`AccountId`]: 160-bit account identifier derived from a public key
//! - [`Currency`]: 160-bit currency code (all zeros is the native asset)
//! - [`Drops`]: native amount in indivisible units
//! - [`IouValue`]: normalized decimal value for issued currencies
//! - [`Amount`]: native or issued amount
//! - [`Quality`]: 64-bit offer ordering metric

pub mod account;
pub mod amount;
pub mod currency;
pub mod error;
pub mod hash;
pub mod quality;

pub use account::AccountId;
pub use amount::{Amount, Asset, Drops, IouValue, IssuedAmount};
pub use currency::Currency;
pub use error::TypeError;
pub use hash::Hash256;
pub use quality::{book_base, quality_next, Quality};
