use serde::{Deserialize, Serialize};

/// Which structure a stored node belongs to.
///
/// The class is carried alongside the bytes so a backend can partition or
/// account for nodes without decoding them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeClass {
    /// Inner and leaf nodes of the account-state tree.
    AccountNode,
    /// Inner and leaf nodes of the transaction tree.
    TransactionNode,
    /// Encoded closed-ledger headers.
    LedgerHeader,
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountNode => write!(f, "account-node"),
            Self::TransactionNode => write!(f, "transaction-node"),
            Self::LedgerHeader => write!(f, "ledger-header"),
        }
    }
}

/// A stored node: class tag + serialized bytes + cached size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredNode {
    pub class: NodeClass,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredNode {
    pub fn new(class: NodeClass, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { class, data, size }
    }
}
