use rcl_store::StoreError;
use rcl_types::Hash256;

/// Errors from Merkle state tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The tree has been frozen and can no longer change.
    #[error("tree is immutable")]
    Immutable,

    #[error("key already present: {0}")]
    DuplicateKey(Hash256),

    #[error("key not present: {0}")]
    MissingKey(Hash256),

    /// A node referenced by its parent is absent from the store.
    #[error("node missing from store: {0}")]
    MissingNode(Hash256),

    /// A stored node does not hash to the hash it was referenced by, or
    /// cannot be decoded.
    #[error("corrupt node {hash}: {reason}")]
    Corrupt { hash: Hash256, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
