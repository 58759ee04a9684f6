use rcl_types::Hash256;

use crate::error::StoreResult;
use crate::node::{NodeClass, StoredNode};

/// Durable key-value store for tree nodes and ledger headers, keyed by hash.
///
/// Implementations must satisfy these invariants:
/// - A hash always maps to the same bytes; rewriting a present node is a
///   no-op.
/// - Concurrent reads are always safe.
/// - The store never interprets node contents.
/// - A failed batch may have been partially applied, but every node it did
///   write is complete. Callers retry the whole batch.
pub trait NodeStore: Send + Sync {
    /// Read a node by hash.
    ///
    /// Returns `Ok(None)` if the node does not exist.
    fn fetch(&self, hash: &Hash256) -> StoreResult<Option<StoredNode>>;

    /// Write one node.
    fn store(&self, hash: Hash256, node: StoredNode) -> StoreResult<()>;

    /// Check whether a node exists in the store.
    fn exists(&self, hash: &Hash256) -> StoreResult<bool>;

    /// Write a batch of nodes of one class.
    ///
    /// Default implementation calls `store()` for each node. Backends may
    /// override for better performance (e.g., a single fsync).
    fn store_batch(&self, class: NodeClass, nodes: &[(Hash256, Vec<u8>)]) -> StoreResult<()> {
        for (hash, data) in nodes {
            self.store(*hash, StoredNode::new(class, data.clone()))?;
        }
        Ok(())
    }
}
