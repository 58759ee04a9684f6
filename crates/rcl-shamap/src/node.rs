use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rcl_crypto::ContentHasher;
use rcl_types::Hash256;
use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};
use crate::tree::TreeKind;

/// Branching factor: one child per key nibble.
pub const BRANCHES: usize = 16;

/// Generation 0 marks nodes that were loaded from a store.
static NEXT_COW_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a fresh, never-zero copy-on-write generation.
pub(crate) fn next_cow_id() -> u32 {
    loop {
        let id = NEXT_COW_ID.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
    }
}

/// A key and its opaque serialized value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeItem {
    key: Hash256,
    data: Vec<u8>,
}

impl TreeItem {
    pub fn new(key: Hash256, data: Vec<u8>) -> Self {
        Self { key, data }
    }

    pub fn key(&self) -> &Hash256 {
        &self.key
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Hash of a leaf: the kind's leaf domain over `data ‖ key`.
pub(crate) fn leaf_hash(kind: TreeKind, item: &TreeItem) -> Hash256 {
    kind.leaf_hasher()
        .hash_parts(&[item.data.as_slice(), &item.key.as_bytes()[..]])
}

/// Hash of an inner node over its 16 child hashes. No children hashes to zero.
pub(crate) fn inner_hash(child_hashes: &[Hash256; BRANCHES]) -> Hash256 {
    if child_hashes.iter().all(Hash256::is_zero) {
        return Hash256::zero();
    }
    let parts: Vec<&[u8]> = child_hashes.iter().map(|h| &h.as_bytes()[..]).collect();
    ContentHasher::INNER.hash_parts(&parts)
}

#[derive(Debug)]
pub(crate) enum TreeNode {
    Inner(InnerNode),
    Leaf(LeafNode),
}

impl TreeNode {
    pub(crate) fn hash(&self) -> Hash256 {
        match self {
            Self::Inner(inner) => inner.hash,
            Self::Leaf(leaf) => leaf.hash,
        }
    }

    pub(crate) fn cow_id(&self) -> u32 {
        match self {
            Self::Inner(inner) => inner.cow_id,
            Self::Leaf(leaf) => leaf.cow_id,
        }
    }

    pub(crate) fn leaf(kind: TreeKind, item: TreeItem, cow_id: u32) -> Self {
        Self::Leaf(LeafNode::new(kind, item, cow_id))
    }

    pub(crate) fn encode(&self) -> TreeResult<Vec<u8>> {
        match self {
            Self::Inner(inner) => inner.encode(),
            Self::Leaf(leaf) => leaf.encode(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InnerNode {
    pub(crate) children: [Option<Arc<TreeNode>>; BRANCHES],
    pub(crate) hash: Hash256,
    pub(crate) cow_id: u32,
}

impl InnerNode {
    pub(crate) fn empty(cow_id: u32) -> Self {
        Self {
            children: Default::default(),
            hash: Hash256::zero(),
            cow_id,
        }
    }

    /// Build an inner node and compute its hash.
    pub(crate) fn new(children: [Option<Arc<TreeNode>>; BRANCHES], cow_id: u32) -> Self {
        let mut node = Self {
            children,
            hash: Hash256::zero(),
            cow_id,
        };
        node.hash = inner_hash(&node.child_hashes());
        node
    }

    pub(crate) fn child_hashes(&self) -> [Hash256; BRANCHES] {
        let mut hashes = [Hash256::zero(); BRANCHES];
        for (slot, child) in hashes.iter_mut().zip(self.children.iter()) {
            if let Some(child) = child {
                *slot = child.hash();
            }
        }
        hashes
    }

    pub(crate) fn encode(&self) -> TreeResult<Vec<u8>> {
        SerializedNode::Inner {
            children: self.child_hashes(),
        }
        .encode()
    }

    /// The only child, if exactly one slot is occupied.
    pub(crate) fn only_child(&self) -> Option<&Arc<TreeNode>> {
        let mut occupied = self.children.iter().flatten();
        match (occupied.next(), occupied.next()) {
            (Some(child), None) => Some(child),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LeafNode {
    pub(crate) item: TreeItem,
    pub(crate) hash: Hash256,
    pub(crate) cow_id: u32,
}

impl LeafNode {
    pub(crate) fn new(kind: TreeKind, item: TreeItem, cow_id: u32) -> Self {
        let hash = leaf_hash(kind, &item);
        Self { item, hash, cow_id }
    }

    pub(crate) fn encode(&self) -> TreeResult<Vec<u8>> {
        SerializedNode::Leaf {
            key: self.item.key,
            data: self.item.data.clone(),
        }
        .encode()
    }
}

/// Stored form of a node.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum SerializedNode {
    Inner { children: [Hash256; BRANCHES] },
    Leaf { key: Hash256, data: Vec<u8> },
}

impl SerializedNode {
    pub(crate) fn encode(&self) -> TreeResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TreeError::Serialization(e.to_string()))
    }

    pub(crate) fn decode(hash: &Hash256, bytes: &[u8]) -> TreeResult<Self> {
        bincode::deserialize(bytes).map_err(|e| TreeError::Corrupt {
            hash: *hash,
            reason: e.to_string(),
        })
    }
}
