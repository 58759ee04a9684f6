use rcl_types::Hash256;
use serde::{Deserialize, Serialize};

use crate::node::{inner_hash, leaf_hash, TreeItem, BRANCHES};
use crate::tree::TreeKind;

/// Maximum number of inner levels on a key path.
const MAX_LEVELS: usize = 64;

/// Inclusion proof for one key of a [`MerkleStateTree`](crate::MerkleStateTree).
///
/// `path[d]` holds the 16 child hashes of the inner node at depth `d` on the
/// way from the root to the leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeProof {
    kind: TreeKind,
    key: Hash256,
    data: Vec<u8>,
    path: Vec<[Hash256; BRANCHES]>,
}

impl TreeProof {
    pub(crate) fn new(
        kind: TreeKind,
        key: Hash256,
        data: Vec<u8>,
        path: Vec<[Hash256; BRANCHES]>,
    ) -> Self {
        Self {
            kind,
            key,
            data,
            path,
        }
    }

    pub fn key(&self) -> &Hash256 {
        &self.key
    }

    /// The proven value.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn path(&self) -> &[[Hash256; BRANCHES]] {
        &self.path
    }

    /// Number of inner nodes between the root and the leaf, root included.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Recompute the root from the leaf upward and compare with `root`.
    pub fn verify(&self, root: &Hash256) -> bool {
        if self.path.is_empty() || self.path.len() > MAX_LEVELS {
            return false;
        }
        let mut current = leaf_hash(self.kind, &TreeItem::new(self.key, self.data.clone()));
        for (depth, level) in self.path.iter().enumerate().rev() {
            if level[self.key.nibble(depth)] != current {
                return false;
            }
            current = inner_hash(level);
        }
        current == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MerkleStateTree;

    fn sample_tree() -> MerkleStateTree {
        let mut tree = MerkleStateTree::new(TreeKind::AccountState);
        for i in 0u8..20 {
            tree.add(Hash256::digest(&[i]), vec![i; 3]).unwrap();
        }
        tree
    }

    #[test]
    fn proof_verifies_against_root() {
        let tree = sample_tree();
        for i in 0u8..20 {
            let proof = tree.prove(&Hash256::digest(&[i])).unwrap();
            assert_eq!(proof.data(), &[i; 3]);
            assert!(proof.verify(&tree.root_hash()));
        }
    }

    #[test]
    fn proof_fails_for_other_root() {
        let mut tree = sample_tree();
        let proof = tree.prove(&Hash256::digest(&[1])).unwrap();
        tree.update(Hash256::digest(&[2]), vec![0xFF]).unwrap();
        assert!(!proof.verify(&tree.root_hash()));
    }

    #[test]
    fn tampered_value_fails() {
        let tree = sample_tree();
        let mut proof = tree.prove(&Hash256::digest(&[5])).unwrap();
        proof.data = b"forged".to_vec();
        assert!(!proof.verify(&tree.root_hash()));
    }

    #[test]
    fn absent_key_has_no_proof() {
        let tree = sample_tree();
        assert!(tree.prove(&Hash256::digest(b"absent")).is_none());
        assert!(MerkleStateTree::new(TreeKind::Transaction)
            .prove(&Hash256::digest(b"x"))
            .is_none());
    }
}
