use rcl_types::Hash256;

/// Errors from node store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested node was not found.
    #[error("node not found: {0}")]
    NotFound(Hash256),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored bytes cannot be decoded as a node.
    #[error("corrupt node {hash}: {reason}")]
    CorruptNode { hash: Hash256, reason: String },

    /// Attempted to store a node under the zero hash.
    #[error("cannot store node with zero hash")]
    NullHash,

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
