use std::collections::BTreeMap;

use rcl_ledger::Ledger;
use rcl_types::Hash256;

use crate::error::EngineResult;
use crate::transaction::{Transaction, TxRecord};

/// Position of a transaction in a canonical set.
///
/// Ordering by `id XOR set_hash` first means no submitter can choose where
/// its transaction lands without also controlling the set hash; the raw id
/// breaks the (astronomically unlikely) ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey {
    order: Hash256,
    id: Hash256,
}

impl CanonicalKey {
    pub fn new(set_hash: &Hash256, id: Hash256) -> Self {
        Self {
            order: id.xor(set_hash),
            id,
        }
    }

    pub fn id(&self) -> Hash256 {
        self.id
    }
}

/// A transaction waiting in a canonical set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTx {
    pub tx: Transaction,
    /// Times the transaction came back retriable.
    pub retries: u32,
}

/// Deterministically ordered transactions of one close.
#[derive(Clone, Debug)]
pub struct CanonicalTxSet {
    set_hash: Hash256,
    entries: BTreeMap<CanonicalKey, PendingTx>,
}

impl CanonicalTxSet {
    pub fn new(set_hash: Hash256) -> Self {
        Self {
            set_hash,
            entries: BTreeMap::new(),
        }
    }

    /// The transactions recorded in `ledger`, keyed by its transaction
    /// tree root.
    pub fn from_ledger(ledger: &Ledger) -> EngineResult<Self> {
        let mut set = Self::new(ledger.tx_tree().root_hash());
        for item in ledger.transactions() {
            let record = TxRecord::decode(item.data())?;
            set.entries.insert(
                CanonicalKey::new(&set.set_hash, *item.key()),
                PendingTx {
                    tx: record.tx,
                    retries: 0,
                },
            );
        }
        Ok(set)
    }

    pub fn set_hash(&self) -> Hash256 {
        self.set_hash
    }

    /// Add a transaction; returns its id. Re-inserting is a no-op.
    pub fn insert(&mut self, tx: Transaction) -> EngineResult<Hash256> {
        let id = tx.id()?;
        self.entries
            .entry(CanonicalKey::new(&self.set_hash, id))
            .or_insert(PendingTx { tx, retries: 0 });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in application order.
    pub fn keys(&self) -> Vec<CanonicalKey> {
        self.entries.keys().copied().collect()
    }

    /// Transaction ids in application order.
    pub fn ids(&self) -> Vec<Hash256> {
        self.entries.keys().map(CanonicalKey::id).collect()
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&PendingTx> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalKey, &PendingTx)> {
        self.entries.iter()
    }

    pub fn remove(&mut self, key: &CanonicalKey) -> Option<PendingTx> {
        self.entries.remove(key)
    }

    /// Count one more retriable failure; returns the new count.
    pub fn record_retry(&mut self, key: &CanonicalKey) -> Option<u32> {
        self.entries.get_mut(key).map(|pending| {
            pending.retries += 1;
            pending.retries
        })
    }

    pub fn retries(&self, id: &Hash256) -> Option<u32> {
        self.entries
            .get(&CanonicalKey::new(&self.set_hash, *id))
            .map(|pending| pending.retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rcl_crypto::{KeyPair, Seed, SignatureAlgorithm};
    use rcl_types::{Amount, Drops};

    fn txs(count: u32) -> Vec<Transaction> {
        let seed = Seed::from_passphrase("masterpassphrase").unwrap();
        let keys = KeyPair::derive(&seed, SignatureAlgorithm::Secp256k1).unwrap();
        (1..=count)
            .map(|seq| {
                Transaction::payment(
                    keys.public_key().clone(),
                    seq,
                    Drops::new(10),
                    keys.account_id(),
                    Amount::native(u64::from(seq)),
                )
            })
            .collect()
    }

    #[test]
    fn order_depends_on_set_hash() {
        let a = Hash256::digest(b"set-a");
        let b = Hash256::digest(b"set-b");
        let mut first = CanonicalTxSet::new(a);
        let mut second = CanonicalTxSet::new(b);
        for tx in txs(16) {
            first.insert(tx.clone()).unwrap();
            second.insert(tx).unwrap();
        }
        assert_eq!(first.len(), 16);
        let mut sorted_first = first.ids();
        let mut sorted_second = second.ids();
        assert_ne!(sorted_first, sorted_second);
        sorted_first.sort();
        sorted_second.sort();
        assert_eq!(sorted_first, sorted_second);
    }

    #[test]
    fn retries_are_counted() {
        let mut set = CanonicalTxSet::new(Hash256::digest(b"set"));
        let id = set.insert(txs(1).remove(0)).unwrap();
        let key = set.keys()[0];
        assert_eq!(set.retries(&id), Some(0));
        assert_eq!(set.record_retry(&key), Some(1));
        assert_eq!(set.record_retry(&key), Some(2));
        assert_eq!(set.retries(&id), Some(2));
        assert!(set.remove(&key).is_some());
        assert!(set.is_empty());
        assert_eq!(set.record_retry(&key), None);
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut set = CanonicalTxSet::new(Hash256::digest(b"set"));
        let tx = txs(1).remove(0);
        let id = set.insert(tx.clone()).unwrap();
        let key = set.keys()[0];
        set.record_retry(&key);
        assert_eq!(set.insert(tx).unwrap(), id);
        assert_eq!(set.len(), 1);
        assert_eq!(set.retries(&id), Some(1));
    }

    proptest! {
        #[test]
        fn order_ignores_insertion_order(seed in any::<u64>()) {
            let set_hash = Hash256::digest(&seed.to_be_bytes());
            let mut forward = CanonicalTxSet::new(set_hash);
            let mut backward = CanonicalTxSet::new(set_hash);
            let all = txs(8);
            for tx in all.iter().cloned() {
                forward.insert(tx).unwrap();
            }
            for tx in all.into_iter().rev() {
                backward.insert(tx).unwrap();
            }
            prop_assert_eq!(forward.ids(), backward.ids());
        }
    }
}
