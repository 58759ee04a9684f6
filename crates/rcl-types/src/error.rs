use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}
