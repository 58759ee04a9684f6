use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use rcl_types::Hash256;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::node::{NodeClass, StoredNode};
use crate::traits::NodeStore;

/// In-memory, HashMap-based node store.
///
/// Intended for tests and embedding. Nodes are held behind a `RwLock` and
/// cloned on read. The store can be switched read-only, after which every
/// write fails with [`StoreError::ReadOnly`].
pub struct InMemoryNodeStore {
    nodes: RwLock<HashMap<Hash256, StoredNode>>,
    read_only: AtomicBool,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// Refuse (or accept again) all writes.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    /// Number of nodes currently stored.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().expect("lock poisoned").is_empty()
    }

    /// Number of stored nodes of one class.
    pub fn count_by_class(&self, class: NodeClass) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .filter(|node| node.class == class)
            .count()
    }

    /// Total bytes across all stored nodes.
    pub fn total_bytes(&self) -> u64 {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .map(|node| node.size)
            .sum()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn fetch(&self, hash: &Hash256) -> StoreResult<Option<StoredNode>> {
        let map = self.nodes.read().expect("lock poisoned");
        Ok(map.get(hash).cloned())
    }

    fn store(&self, hash: Hash256, node: StoredNode) -> StoreResult<()> {
        self.check_writable()?;
        if hash.is_zero() {
            return Err(StoreError::NullHash);
        }
        let mut map = self.nodes.write().expect("lock poisoned");
        map.entry(hash).or_insert(node);
        Ok(())
    }

    fn exists(&self, hash: &Hash256) -> StoreResult<bool> {
        let map = self.nodes.read().expect("lock poisoned");
        Ok(map.contains_key(hash))
    }

    /// Writes the whole batch under one lock, so a batch is all or nothing.
    fn store_batch(&self, class: NodeClass, nodes: &[(Hash256, Vec<u8>)]) -> StoreResult<()> {
        self.check_writable()?;
        if nodes.iter().any(|(hash, _)| hash.is_zero()) {
            return Err(StoreError::NullHash);
        }
        let mut map = self.nodes.write().expect("lock poisoned");
        for (hash, data) in nodes {
            map.entry(*hash)
                .or_insert_with(|| StoredNode::new(class, data.clone()));
        }
        debug!(%class, count = nodes.len(), total = map.len(), "stored node batch");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNodeStore")
            .field("node_count", &self.len())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(tag: &[u8]) -> Hash256 {
        Hash256::digest(tag)
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    #[test]
    fn store_and_fetch() {
        let store = InMemoryNodeStore::new();
        let node = StoredNode::new(NodeClass::AccountNode, b"leaf".to_vec());
        store.store(hash(b"a"), node.clone()).unwrap();

        let read_back = store.fetch(&hash(b"a")).unwrap().expect("should exist");
        assert_eq!(read_back, node);
        assert_eq!(read_back.size, 4);
    }

    #[test]
    fn fetch_missing_returns_none() {
        let store = InMemoryNodeStore::new();
        assert!(store.fetch(&hash(b"missing")).unwrap().is_none());
        assert!(!store.exists(&hash(b"missing")).unwrap());
    }

    #[test]
    fn zero_hash_is_rejected() {
        let store = InMemoryNodeStore::new();
        let node = StoredNode::new(NodeClass::AccountNode, vec![1]);
        assert!(matches!(
            store.store(Hash256::zero(), node),
            Err(StoreError::NullHash)
        ));
        assert!(matches!(
            store.store_batch(NodeClass::AccountNode, &[(Hash256::zero(), vec![1])]),
            Err(StoreError::NullHash)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn rewrite_is_idempotent() {
        let store = InMemoryNodeStore::new();
        let node = StoredNode::new(NodeClass::TransactionNode, b"tx".to_vec());
        store.store(hash(b"t"), node.clone()).unwrap();
        store.store(hash(b"t"), node).unwrap();
        assert_eq!(store.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Batches and classes
    // -----------------------------------------------------------------------

    #[test]
    fn batch_counts_by_class() {
        let store = InMemoryNodeStore::new();
        store
            .store_batch(
                NodeClass::AccountNode,
                &[(hash(b"1"), vec![1]), (hash(b"2"), vec![2, 2])],
            )
            .unwrap();
        store
            .store_batch(NodeClass::TransactionNode, &[(hash(b"3"), vec![3])])
            .unwrap();
        assert_eq!(store.count_by_class(NodeClass::AccountNode), 2);
        assert_eq!(store.count_by_class(NodeClass::TransactionNode), 1);
        assert_eq!(store.count_by_class(NodeClass::LedgerHeader), 0);
        assert_eq!(store.total_bytes(), 4);
    }

    // -----------------------------------------------------------------------
    // Read-only switch
    // -----------------------------------------------------------------------

    #[test]
    fn read_only_refuses_writes() {
        let store = InMemoryNodeStore::new();
        store.set_read_only(true);
        let result = store.store_batch(NodeClass::AccountNode, &[(hash(b"x"), vec![0])]);
        assert!(matches!(result, Err(StoreError::ReadOnly)));
        assert!(store.is_empty());

        store.set_read_only(false);
        store
            .store_batch(NodeClass::AccountNode, &[(hash(b"x"), vec![0])])
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reads_work_while_read_only() {
        let store = InMemoryNodeStore::new();
        store
            .store(hash(b"r"), StoredNode::new(NodeClass::LedgerHeader, vec![9]))
            .unwrap();
        store.set_read_only(true);
        assert!(store.exists(&hash(b"r")).unwrap());
        assert!(store.fetch(&hash(b"r")).unwrap().is_some());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryNodeStore::new());
        store
            .store(hash(b"shared"), StoredNode::new(NodeClass::AccountNode, vec![7]))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let node = store.fetch(&hash(b"shared")).unwrap();
                    assert_eq!(node.map(|n| n.data), Some(vec![7]));
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryNodeStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryNodeStore"));
        assert!(debug.contains("node_count"));
    }
}
