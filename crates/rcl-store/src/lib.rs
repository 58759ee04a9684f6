//! Node storage contract for the replicated closing ledger.
//!
//! The ledger core only needs get/put by hash from its durable store. Tree
//! flushes write every dirty node of a tree in one [`NodeStore::store_batch`]
//! call tagged with the tree's [`NodeClass`]; closed ledger headers are
//! written under [`NodeClass::LedgerHeader`].
//!
//! # Storage Backends
//!
//! - [`InMemoryNodeStore`] -- `HashMap`-based store for tests and embedding,
//!   with per-class counters and a read-only switch for failure testing

pub mod error;
pub mod memory;
pub mod node;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryNodeStore;
pub use node::{NodeClass, StoredNode};
pub use traits::NodeStore;
