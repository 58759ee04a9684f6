//! Merkle state tree for the replicated closing ledger.
//!
//! A [`MerkleStateTree`] maps 256-bit keys to opaque values through a
//! 16-ary radix tree of hashed nodes. Both the account-state tree and the
//! transaction tree of a ledger are instances, distinguished by
//! [`TreeKind`], which selects the leaf hashing domain and the store class.
//!
//! # Guarantees
//!
//! - The root hash is a pure function of the `(key, value)` set.
//! - Snapshots are O(1); nodes are immutable and shared via `Arc`.
//! - [`MerkleStateTree::flush_dirty`] writes exactly the nodes created since
//!   the last successful flush, in one batch.
//! - [`MerkleStateTree::load`] verifies every node hash it reads.
//! - [`TreeProof`] proves a single key against a root hash.

pub mod error;
mod node;
pub mod proof;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use node::TreeItem;
pub use proof::TreeProof;
pub use tree::{MerkleStateTree, TreeKind};
