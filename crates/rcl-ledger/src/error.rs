use rcl_shamap::TreeError;
use rcl_store::StoreError;
use rcl_types::Hash256;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger {seq} is no longer open")]
    NotOpen { seq: u32 },

    #[error("ledger {seq} is not closed")]
    NotClosed { seq: u32 },

    #[error("ledger {seq} has not been sealed")]
    NotSealed { seq: u32 },

    #[error("transaction already in ledger: {0}")]
    DuplicateTransaction(Hash256),

    #[error("cannot destroy {requested} drops, only {available} exist")]
    InsufficientDrops { requested: u64, available: u64 },

    #[error("ledger header not found: {0}")]
    MissingHeader(Hash256),

    #[error("integrity violation in ledger {seq}: {reason}")]
    IntegrityViolation { seq: u32, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Whether the failure came from the durable store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Tree(TreeError::Store(_)))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
