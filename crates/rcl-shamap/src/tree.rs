use std::sync::Arc;

use rcl_crypto::ContentHasher;
use rcl_store::{NodeClass, NodeStore};
use rcl_types::Hash256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::node::{
    next_cow_id, InnerNode, LeafNode, SerializedNode, TreeItem, TreeNode, BRANCHES,
};
use crate::proof::TreeProof;

/// Key depth in nibbles; no key path is longer.
const MAX_DEPTH: usize = 64;

/// What a tree holds. Selects the leaf hashing domain and the store class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeKind {
    /// Ledger entries keyed by their index.
    AccountState,
    /// Transactions with metadata keyed by transaction id.
    Transaction,
}

impl TreeKind {
    pub fn node_class(&self) -> NodeClass {
        match self {
            Self::AccountState => NodeClass::AccountNode,
            Self::Transaction => NodeClass::TransactionNode,
        }
    }

    pub(crate) fn leaf_hasher(&self) -> &'static ContentHasher {
        match self {
            Self::AccountState => &ContentHasher::ACCOUNT_LEAF,
            Self::Transaction => &ContentHasher::TX_LEAF,
        }
    }
}

/// A 16-ary Merkle radix tree from 256-bit keys to opaque values.
///
/// # Structure
///
/// The root is always an inner node. Below it, a subtree holding one key is
/// a leaf and a subtree holding two or more keys is an inner node branching
/// on the next key nibble. The shape, and with it the root hash, is a pure
/// function of the stored `(key, value)` set.
///
/// # Copy-on-write
///
/// Nodes are immutable and shared through `Arc`. A mutation rebuilds the
/// path from the touched leaf to the root and reuses every other subtree, so
/// [`snapshot`](Self::snapshot) is O(1).
///
/// # Dirty tracking
///
/// Every node records the generation (`cow_id`) of the tree that created it.
/// Nodes carrying the tree's current generation are dirty. A successful
/// [`flush_dirty`](Self::flush_dirty) writes them and moves the tree to a new
/// generation; nodes loaded from a store carry generation 0 and are never
/// dirty. A mutable snapshot starts its own generation, so dirty nodes it
/// shares with its source stay the source's to flush.
pub struct MerkleStateTree {
    kind: TreeKind,
    root: Arc<InnerNode>,
    cow_id: u32,
    immutable: bool,
    len: usize,
}

impl MerkleStateTree {
    /// An empty, mutable tree.
    pub fn new(kind: TreeKind) -> Self {
        let cow_id = next_cow_id();
        Self {
            kind,
            root: Arc::new(InnerNode::empty(cow_id)),
            cow_id,
            immutable: false,
            len: 0,
        }
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// The root hash. Zero for an empty tree.
    pub fn root_hash(&self) -> Hash256 {
        self.root.hash
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Freeze the tree. Every later mutation fails with [`TreeError::Immutable`].
    pub fn set_immutable(&mut self) {
        self.immutable = true;
    }

    /// An O(1) copy sharing every node with this tree.
    ///
    /// A mutable snapshot gets its own generation. An immutable snapshot
    /// keeps this tree's generation, so it can still flush the nodes it
    /// shares.
    pub fn snapshot(&self, mutable: bool) -> Self {
        Self {
            kind: self.kind,
            root: Arc::clone(&self.root),
            cow_id: if mutable { next_cow_id() } else { self.cow_id },
            immutable: !mutable,
            len: self.len,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &Hash256) -> Option<&[u8]> {
        self.find_leaf(key).map(|leaf| leaf.item.data())
    }

    pub fn contains(&self, key: &Hash256) -> bool {
        self.find_leaf(key).is_some()
    }

    fn find_leaf(&self, key: &Hash256) -> Option<&LeafNode> {
        let mut node: &InnerNode = &self.root;
        let mut depth = 0;
        loop {
            match node.children[key.nibble(depth)].as_deref()? {
                TreeNode::Leaf(leaf) => return (leaf.item.key() == key).then_some(leaf),
                TreeNode::Inner(inner) => {
                    node = inner;
                    depth += 1;
                }
            }
        }
    }

    /// Every item, in ascending key order.
    pub fn items(&self) -> Vec<&TreeItem> {
        let mut out = Vec::with_capacity(self.len);
        collect_items(&self.root, &mut out);
        out
    }

    /// Inclusion proof for `key`, or `None` if the key is absent.
    pub fn prove(&self, key: &Hash256) -> Option<TreeProof> {
        let mut path = Vec::new();
        let mut node: &InnerNode = &self.root;
        let mut depth = 0;
        loop {
            path.push(node.child_hashes());
            match node.children[key.nibble(depth)].as_deref()? {
                TreeNode::Leaf(leaf) if leaf.item.key() == key => {
                    return Some(TreeProof::new(
                        self.kind,
                        *key,
                        leaf.item.data().to_vec(),
                        path,
                    ));
                }
                TreeNode::Leaf(_) => return None,
                TreeNode::Inner(inner) => {
                    node = inner;
                    depth += 1;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Insert a new key. Fails if the key is already present.
    pub fn add(&mut self, key: Hash256, data: Vec<u8>) -> TreeResult<()> {
        self.check_mutable()?;
        if self.contains(&key) {
            return Err(TreeError::DuplicateKey(key));
        }
        self.put(key, data);
        self.len += 1;
        Ok(())
    }

    /// Replace the value of an existing key. Fails if the key is absent.
    pub fn update(&mut self, key: Hash256, data: Vec<u8>) -> TreeResult<()> {
        self.check_mutable()?;
        if !self.contains(&key) {
            return Err(TreeError::MissingKey(key));
        }
        self.put(key, data);
        Ok(())
    }

    /// Insert or replace. Returns `true` if the key was new.
    pub fn insert(&mut self, key: Hash256, data: Vec<u8>) -> TreeResult<bool> {
        self.check_mutable()?;
        let added = !self.contains(&key);
        self.put(key, data);
        if added {
            self.len += 1;
        }
        Ok(added)
    }

    /// Delete a key. Fails if the key is absent.
    pub fn remove(&mut self, key: &Hash256) -> TreeResult<()> {
        self.check_mutable()?;
        let root = remove_below(&self.root, 0, key, self.cow_id)
            .ok_or(TreeError::MissingKey(*key))?;
        self.root = Arc::new(root);
        self.len -= 1;
        Ok(())
    }

    fn put(&mut self, key: Hash256, data: Vec<u8>) {
        let leaf = Arc::new(TreeNode::leaf(
            self.kind,
            TreeItem::new(key, data),
            self.cow_id,
        ));
        self.root = Arc::new(insert_below(&self.root, 0, leaf, &key, self.cow_id));
    }

    fn check_mutable(&self) -> TreeResult<()> {
        if self.immutable {
            return Err(TreeError::Immutable);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Returns `true` if any node still needs to be written.
    pub fn has_dirty_nodes(&self) -> bool {
        self.root.cow_id == self.cow_id && !self.root.hash.is_zero()
    }

    /// Write every dirty node to `store` in one batch under this tree's node
    /// class, then start a new generation.
    ///
    /// Returns the number of nodes written. On failure nothing is marked
    /// clean and the flush can be retried.
    pub fn flush_dirty(&mut self, store: &dyn NodeStore) -> TreeResult<usize> {
        let mut batch = Vec::new();
        if !self.root.hash.is_zero() && self.root.cow_id == self.cow_id {
            collect_dirty(&self.root, self.cow_id, &mut batch)?;
        }
        if batch.is_empty() {
            return Ok(0);
        }
        let class = self.kind.node_class();
        store.store_batch(class, &batch)?;
        debug!(
            %class,
            nodes = batch.len(),
            root = %self.root.hash.short_hex(),
            "flushed dirty tree nodes"
        );
        self.cow_id = next_cow_id();
        Ok(batch.len())
    }

    /// Rebuild a tree from `store`, verifying the hash of every node.
    pub fn load(kind: TreeKind, root_hash: &Hash256, store: &dyn NodeStore) -> TreeResult<Self> {
        if root_hash.is_zero() {
            return Ok(Self::new(kind));
        }
        let mut len = 0;
        let root = match load_node(kind, store, root_hash, 0, &mut len)? {
            TreeNode::Inner(inner) => inner,
            TreeNode::Leaf(_) => {
                return Err(TreeError::Corrupt {
                    hash: *root_hash,
                    reason: "root is not an inner node".into(),
                })
            }
        };
        debug!(?kind, root = %root_hash.short_hex(), items = len, "loaded tree");
        Ok(Self {
            kind,
            root: Arc::new(root),
            cow_id: next_cow_id(),
            immutable: false,
            len,
        })
    }
}

impl std::fmt::Debug for MerkleStateTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerkleStateTree")
            .field("kind", &self.kind)
            .field("root", &self.root.hash)
            .field("len", &self.len)
            .field("cow_id", &self.cow_id)
            .field("immutable", &self.immutable)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Path copying
// ---------------------------------------------------------------------------

fn insert_below(
    node: &InnerNode,
    depth: usize,
    leaf: Arc<TreeNode>,
    key: &Hash256,
    cow_id: u32,
) -> InnerNode {
    let branch = key.nibble(depth);
    let replacement = match node.children[branch].as_ref() {
        None => leaf,
        Some(child) => match child.as_ref() {
            TreeNode::Leaf(existing) if existing.item.key() == key => leaf,
            TreeNode::Leaf(existing) => Arc::new(TreeNode::Inner(split(
                Arc::clone(child),
                existing.item.key(),
                leaf,
                key,
                depth + 1,
                cow_id,
            ))),
            TreeNode::Inner(inner) => Arc::new(TreeNode::Inner(insert_below(
                inner,
                depth + 1,
                leaf,
                key,
                cow_id,
            ))),
        },
    };
    let mut children = node.children.clone();
    children[branch] = Some(replacement);
    InnerNode::new(children, cow_id)
}

/// Inner nodes holding two leaves whose keys agree up to `depth`.
fn split(
    existing: Arc<TreeNode>,
    existing_key: &Hash256,
    leaf: Arc<TreeNode>,
    key: &Hash256,
    depth: usize,
    cow_id: u32,
) -> InnerNode {
    let mut children: [Option<Arc<TreeNode>>; BRANCHES] = Default::default();
    let (old_branch, new_branch) = (existing_key.nibble(depth), key.nibble(depth));
    if old_branch == new_branch {
        let below = split(existing, existing_key, leaf, key, depth + 1, cow_id);
        children[old_branch] = Some(Arc::new(TreeNode::Inner(below)));
    } else {
        children[old_branch] = Some(existing);
        children[new_branch] = Some(leaf);
    }
    InnerNode::new(children, cow_id)
}

/// The node rebuilt without `key`, or `None` if `key` is not below it.
fn remove_below(node: &InnerNode, depth: usize, key: &Hash256, cow_id: u32) -> Option<InnerNode> {
    let branch = key.nibble(depth);
    let child = node.children[branch].as_ref()?;
    let replacement = match child.as_ref() {
        TreeNode::Leaf(leaf) if leaf.item.key() == key => None,
        TreeNode::Leaf(_) => return None,
        TreeNode::Inner(inner) => Some(collapse(remove_below(inner, depth + 1, key, cow_id)?)),
    };
    let mut children = node.children.clone();
    children[branch] = replacement;
    Some(InnerNode::new(children, cow_id))
}

/// A non-root inner node left with a single leaf is replaced by that leaf.
fn collapse(inner: InnerNode) -> Arc<TreeNode> {
    if let Some(only) = inner.only_child() {
        if matches!(only.as_ref(), TreeNode::Leaf(_)) {
            return Arc::clone(only);
        }
    }
    Arc::new(TreeNode::Inner(inner))
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

fn collect_items<'a>(node: &'a InnerNode, out: &mut Vec<&'a TreeItem>) {
    for child in node.children.iter().flatten() {
        match child.as_ref() {
            TreeNode::Leaf(leaf) => out.push(&leaf.item),
            TreeNode::Inner(inner) => collect_items(inner, out),
        }
    }
}

/// Dirty descendants of a dirty inner node. A clean node never has a dirty
/// child, so clean subtrees are skipped whole.
fn collect_dirty(
    node: &InnerNode,
    cow_id: u32,
    out: &mut Vec<(Hash256, Vec<u8>)>,
) -> TreeResult<()> {
    out.push((node.hash, node.encode()?));
    for child in node.children.iter().flatten() {
        if child.cow_id() != cow_id {
            continue;
        }
        match child.as_ref() {
            TreeNode::Inner(inner) => collect_dirty(inner, cow_id, out)?,
            TreeNode::Leaf(_) => out.push((child.hash(), child.encode()?)),
        }
    }
    Ok(())
}

fn load_node(
    kind: TreeKind,
    store: &dyn NodeStore,
    hash: &Hash256,
    depth: usize,
    len: &mut usize,
) -> TreeResult<TreeNode> {
    let corrupt = |reason: &str| TreeError::Corrupt {
        hash: *hash,
        reason: reason.to_string(),
    };
    if depth > MAX_DEPTH {
        return Err(corrupt("tree deeper than the key length"));
    }
    let stored = store.fetch(hash)?.ok_or(TreeError::MissingNode(*hash))?;
    if stored.class != kind.node_class() {
        return Err(corrupt("node belongs to another tree kind"));
    }
    let node = match SerializedNode::decode(hash, &stored.data)? {
        SerializedNode::Inner { children } => {
            let mut loaded: [Option<Arc<TreeNode>>; BRANCHES] = Default::default();
            for (slot, child_hash) in loaded.iter_mut().zip(children.iter()) {
                if !child_hash.is_zero() {
                    *slot = Some(Arc::new(load_node(kind, store, child_hash, depth + 1, len)?));
                }
            }
            TreeNode::Inner(InnerNode::new(loaded, 0))
        }
        SerializedNode::Leaf { key, data } => {
            *len += 1;
            TreeNode::leaf(kind, TreeItem::new(key, data), 0)
        }
    };
    if node.hash() != *hash {
        return Err(corrupt("content does not match hash"));
    }
    Ok(node)
}
