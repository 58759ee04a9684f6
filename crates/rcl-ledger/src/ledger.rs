use rcl_shamap::{MerkleStateTree, TreeItem, TreeKind};
use rcl_store::{NodeClass, NodeStore, StoredNode};
use rcl_types::{AccountId, Drops, Hash256};
use tracing::{debug, info};

use crate::entries::{AccountRoot, LedgerEntry, LedgerHashes};
use crate::error::{LedgerError, LedgerResult};
use crate::header::LedgerHeader;
use crate::keylet;

/// Ancestors kept in the recent skip list.
pub const SKIP_LIST_SIZE: usize = 256;

/// Where a ledger is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerState {
    /// Accepting entry and transaction changes.
    Open,
    /// Hash computed and trees frozen; not yet persisted.
    Sealed,
    /// Persisted and eligible to be a parent.
    Closed,
}

/// One ledger: a header plus the account-state and transaction trees.
///
/// An open ledger is mutated by transaction application. Sealing stamps the
/// close time, freezes both trees and computes the hash; closing marks the
/// ledger final once it has been flushed. A closed ledger is immutable and
/// the next open ledger shares its state tree copy-on-write.
pub struct Ledger {
    header: LedgerHeader,
    state_tree: MerkleStateTree,
    tx_tree: MerkleStateTree,
    state: LedgerState,
    hash: Hash256,
}

impl Ledger {
    /// The first ledger: `total_drops` held by `master`.
    pub fn genesis(master: &AccountId, total_drops: Drops) -> LedgerResult<Self> {
        let mut ledger = Self {
            header: LedgerHeader {
                sequence: 1,
                total_drops,
                ..Default::default()
            },
            state_tree: MerkleStateTree::new(TreeKind::AccountState),
            tx_tree: MerkleStateTree::new(TreeKind::Transaction),
            state: LedgerState::Open,
            hash: Hash256::zero(),
        };
        ledger.put_entry(
            keylet::account(master),
            &LedgerEntry::AccountRoot(AccountRoot::new(*master, total_drops)),
        )?;
        info!(master = %master, drops = total_drops.value(), "created genesis ledger");
        Ok(ledger)
    }

    /// A new open ledger following a closed `parent`.
    pub fn open_from(parent: &Ledger) -> LedgerResult<Self> {
        if parent.state != LedgerState::Closed {
            return Err(LedgerError::NotClosed {
                seq: parent.sequence(),
            });
        }
        Ok(Self {
            header: LedgerHeader {
                sequence: parent.sequence() + 1,
                parent_hash: parent.hash,
                total_drops: parent.header.total_drops,
                parent_close_time: parent.header.close_time,
                close_time_resolution: parent.header.close_time_resolution,
                ..Default::default()
            },
            state_tree: parent.state_tree.snapshot(true),
            tx_tree: MerkleStateTree::new(TreeKind::Transaction),
            state: LedgerState::Open,
            hash: Hash256::zero(),
        })
    }

    /// Read a closed ledger back from `store`, verifying its hash and both
    /// tree roots.
    pub fn load(hash: &Hash256, store: &dyn NodeStore) -> LedgerResult<Self> {
        let stored = store
            .fetch(hash)?
            .filter(|node| node.class == NodeClass::LedgerHeader)
            .ok_or(LedgerError::MissingHeader(*hash))?;
        let header = LedgerHeader::decode(&stored.data)?;
        if header.hash()? != *hash {
            return Err(LedgerError::IntegrityViolation {
                seq: header.sequence,
                reason: "header does not match its hash".into(),
            });
        }
        let mut state_tree = MerkleStateTree::load(TreeKind::AccountState, &header.account_hash, store)?;
        let mut tx_tree = MerkleStateTree::load(TreeKind::Transaction, &header.tx_hash, store)?;
        state_tree.set_immutable();
        tx_tree.set_immutable();
        Ok(Self {
            header,
            state_tree,
            tx_tree,
            state: LedgerState::Closed,
            hash: *hash,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn header(&self) -> &LedgerHeader {
        &self.header
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    /// The ledger hash; zero until sealed.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn parent_hash(&self) -> Hash256 {
        self.header.parent_hash
    }

    pub fn total_drops(&self) -> Drops {
        self.header.total_drops
    }

    pub fn close_time(&self) -> u64 {
        self.header.close_time
    }

    pub fn state(&self) -> LedgerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == LedgerState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == LedgerState::Closed
    }

    pub fn state_tree(&self) -> &MerkleStateTree {
        &self.state_tree
    }

    pub fn tx_tree(&self) -> &MerkleStateTree {
        &self.tx_tree
    }

    fn check_open(&self) -> LedgerResult<()> {
        if self.state != LedgerState::Open {
            return Err(LedgerError::NotOpen {
                seq: self.sequence(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    pub fn read_entry(&self, key: &Hash256) -> LedgerResult<Option<LedgerEntry>> {
        self.state_tree
            .get(key)
            .map(LedgerEntry::decode)
            .transpose()
    }

    pub fn account(&self, id: &AccountId) -> LedgerResult<Option<AccountRoot>> {
        match self.read_entry(&keylet::account(id))? {
            Some(LedgerEntry::AccountRoot(root)) => Ok(Some(root)),
            Some(other) => Err(LedgerError::IntegrityViolation {
                seq: self.sequence(),
                reason: format!("account key holds a {} entry", other.kind()),
            }),
            None => Ok(None),
        }
    }

    /// Insert or replace an entry.
    pub fn put_entry(&mut self, key: Hash256, entry: &LedgerEntry) -> LedgerResult<()> {
        self.put_encoded(key, entry.encode()?)
    }

    /// Insert or replace an entry already encoded with [`LedgerEntry::encode`].
    pub fn put_encoded(&mut self, key: Hash256, bytes: Vec<u8>) -> LedgerResult<()> {
        self.check_open()?;
        self.state_tree.insert(key, bytes)?;
        Ok(())
    }

    pub fn remove_entry(&mut self, key: &Hash256) -> LedgerResult<()> {
        self.check_open()?;
        self.state_tree.remove(key)?;
        Ok(())
    }

    /// Take drops out of existence (fees).
    pub fn destroy_drops(&mut self, drops: Drops) -> LedgerResult<()> {
        self.check_open()?;
        self.header.total_drops =
            self.header
                .total_drops
                .checked_sub(drops)
                .ok_or(LedgerError::InsufficientDrops {
                    requested: drops.value(),
                    available: self.header.total_drops.value(),
                })?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Record a transaction (with its metadata) under its id.
    pub fn add_transaction(&mut self, id: Hash256, record: Vec<u8>) -> LedgerResult<()> {
        self.check_open()?;
        if self.tx_tree.contains(&id) {
            return Err(LedgerError::DuplicateTransaction(id));
        }
        self.tx_tree.add(id, record)?;
        Ok(())
    }

    pub fn transaction_count(&self) -> usize {
        self.tx_tree.len()
    }

    /// Recorded transactions in id order.
    pub fn transactions(&self) -> Vec<&TreeItem> {
        self.tx_tree.items()
    }

    // -----------------------------------------------------------------------
    // Skip lists
    // -----------------------------------------------------------------------

    fn hashes_entry(&self, key: &Hash256) -> LedgerResult<Option<LedgerHashes>> {
        match self.read_entry(key)? {
            Some(LedgerEntry::LedgerHashes(hashes)) => Ok(Some(hashes)),
            Some(other) => Err(LedgerError::IntegrityViolation {
                seq: self.sequence(),
                reason: format!("skip list key holds a {} entry", other.kind()),
            }),
            None => Ok(None),
        }
    }

    /// Append the parent hash to the recent skip list and, every 256th
    /// ledger, to the long-range group list.
    pub fn update_skip_list(&mut self) -> LedgerResult<()> {
        self.check_open()?;
        if self.sequence() <= 1 {
            return Ok(());
        }
        let prev_seq = self.sequence() - 1;
        let parent = self.header.parent_hash;

        if prev_seq & 0xff == 0 {
            let key = keylet::skip_list_group(prev_seq);
            let mut group = self.hashes_entry(&key)?.unwrap_or_default();
            group.hashes.push(parent);
            group.last_ledger_sequence = prev_seq;
            self.put_entry(key, &LedgerEntry::LedgerHashes(group))?;
        }

        let key = keylet::skip_list();
        let mut recent = self.hashes_entry(&key)?.unwrap_or_default();
        if recent.hashes.len() == SKIP_LIST_SIZE {
            recent.hashes.remove(0);
        }
        recent.hashes.push(parent);
        recent.last_ledger_sequence = prev_seq;
        self.put_entry(key, &LedgerEntry::LedgerHashes(recent))
    }

    /// Hash of the ancestor (or self) with sequence `seq`, if the skip
    /// lists still reach it.
    pub fn ancestor_hash(&self, seq: u32) -> LedgerResult<Option<Hash256>> {
        if seq == self.sequence() {
            return Ok((!self.hash.is_zero()).then_some(self.hash));
        }
        if seq > self.sequence() || seq == 0 {
            return Ok(None);
        }
        if seq == self.sequence() - 1 {
            return Ok(Some(self.header.parent_hash));
        }
        if let Some(recent) = self.hashes_entry(&keylet::skip_list())? {
            if let Some(hash) = lookup(&recent, seq, 1) {
                return Ok(Some(hash));
            }
        }
        if seq & 0xff == 0 {
            if let Some(group) = self.hashes_entry(&keylet::skip_list_group(seq))? {
                return Ok(lookup(&group, seq, 256));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Closing
    // -----------------------------------------------------------------------

    /// Stamp the close fields, freeze both trees and compute the hash.
    pub fn seal(
        &mut self,
        close_time: u64,
        resolution: u32,
        close_time_correct: bool,
    ) -> LedgerResult<Hash256> {
        self.check_open()?;
        self.header.close_time = close_time;
        self.header.close_time_resolution = resolution;
        self.header.close_time_correct = close_time_correct;
        self.header.account_hash = self.state_tree.root_hash();
        self.header.tx_hash = self.tx_tree.root_hash();
        self.hash = self.header.hash()?;
        self.state_tree.set_immutable();
        self.tx_tree.set_immutable();
        self.state = LedgerState::Sealed;
        debug!(
            seq = self.sequence(),
            hash = %self.hash.short_hex(),
            close_time,
            txs = self.tx_tree.len(),
            "sealed ledger"
        );
        Ok(self.hash)
    }

    /// Write both trees' dirty nodes and the header to `store`.
    ///
    /// Returns the number of tree nodes written.
    pub fn flush(&mut self, store: &dyn NodeStore) -> LedgerResult<usize> {
        if self.state == LedgerState::Open {
            return Err(LedgerError::NotSealed {
                seq: self.sequence(),
            });
        }
        let written = self.state_tree.flush_dirty(store)? + self.tx_tree.flush_dirty(store)?;
        store.store(
            self.hash,
            StoredNode::new(NodeClass::LedgerHeader, self.header.encode()?),
        )?;
        debug!(seq = self.sequence(), nodes = written, "flushed ledger");
        Ok(written)
    }

    /// Declare a sealed ledger final.
    pub fn mark_closed(&mut self) -> LedgerResult<()> {
        match self.state {
            LedgerState::Open => Err(LedgerError::NotSealed {
                seq: self.sequence(),
            }),
            LedgerState::Sealed | LedgerState::Closed => {
                self.state = LedgerState::Closed;
                Ok(())
            }
        }
    }

    /// Check that the hash and roots are present and agree with the trees.
    pub fn assert_sane(&self) -> LedgerResult<()> {
        let fail = |reason: &str| {
            Err(LedgerError::IntegrityViolation {
                seq: self.sequence(),
                reason: reason.to_string(),
            })
        };
        if self.hash.is_zero() {
            return fail("ledger hash is missing");
        }
        if self.header.account_hash.is_zero() {
            return fail("account state root is missing");
        }
        if self.header.account_hash != self.state_tree.root_hash() {
            return fail("account state root does not match the tree");
        }
        if self.header.tx_hash != self.tx_tree.root_hash() {
            return fail("transaction root does not match the tree");
        }
        if self.header.hash()? != self.hash {
            return fail("ledger hash does not match the header");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("seq", &self.header.sequence)
            .field("state", &self.state)
            .field("hash", &self.hash)
            .field("accounts_root", &self.state_tree.root_hash())
            .field("txs", &self.tx_tree.len())
            .finish()
    }
}

/// Position of `seq` in a list whose entries are `stride` ledgers apart.
fn lookup(list: &LedgerHashes, seq: u32, stride: u32) -> Option<Hash256> {
    if seq > list.last_ledger_sequence {
        return None;
    }
    let distance = list.last_ledger_sequence - seq;
    if distance % stride != 0 {
        return None;
    }
    let back = (distance / stride) as usize;
    let len = list.hashes.len();
    (back < len).then(|| list.hashes[len - 1 - back])
}
