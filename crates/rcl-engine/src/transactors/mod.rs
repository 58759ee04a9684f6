//! One [`Transactor`](crate::Transactor) per transaction type.

pub mod account_set;
pub mod offer;
pub mod payment;
pub mod trust_set;

pub use account_set::AccountSetTransactor;
pub use offer::{OfferCancelTransactor, OfferCreateTransactor};
pub use payment::PaymentTransactor;
pub use trust_set::TrustSetTransactor;
