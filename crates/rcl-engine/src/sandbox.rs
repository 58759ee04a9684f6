use std::collections::BTreeMap;

use rcl_ledger::{keylet, AccountRoot, Ledger, LedgerEntry, LedgerError, Offer, TrustLine};
use rcl_types::{AccountId, Asset, Currency, Drops, Hash256, IouValue};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Balance deltas
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceChange {
    Drops(i64),
    Issued(IouValue),
}

/// How one holding of one account moved.
///
/// Issued holdings are per trust line: `asset` names the peer as issuer
/// and a negative change means the account holds less (or owes more).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub account: AccountId,
    pub asset: Asset,
    pub change: BalanceChange,
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Buffered view over an open ledger.
///
/// Reads see buffered writes first, then the ledger. Nothing reaches the
/// ledger until [`Sandbox::into_changes`] is committed, so a rejected
/// transaction leaves no trace.
pub struct Sandbox<'a> {
    base: &'a Ledger,
    changes: BTreeMap<Hash256, Option<LedgerEntry>>,
    destroyed: Drops,
}

impl<'a> Sandbox<'a> {
    pub fn new(base: &'a Ledger) -> Self {
        Self {
            base,
            changes: BTreeMap::new(),
            destroyed: Drops::ZERO,
        }
    }

    pub fn ledger_sequence(&self) -> u32 {
        self.base.sequence()
    }

    pub fn read(&self, key: &Hash256) -> EngineResult<Option<LedgerEntry>> {
        match self.changes.get(key) {
            Some(change) => Ok(change.clone()),
            None => Ok(self.base.read_entry(key)?),
        }
    }

    pub fn put(&mut self, key: Hash256, entry: LedgerEntry) {
        self.changes.insert(key, Some(entry));
    }

    pub fn erase(&mut self, key: Hash256) {
        self.changes.insert(key, None);
    }

    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }

    // -----------------------------------------------------------------------
    // Typed access
    // -----------------------------------------------------------------------

    pub fn account(&self, id: &AccountId) -> EngineResult<Option<AccountRoot>> {
        match self.read(&keylet::account(id))? {
            Some(LedgerEntry::AccountRoot(root)) => Ok(Some(root)),
            Some(other) => Err(self.wrong_kind("account", other.kind())),
            None => Ok(None),
        }
    }

    pub fn put_account(&mut self, root: AccountRoot) {
        self.put(keylet::account(&root.account), LedgerEntry::AccountRoot(root));
    }

    pub fn trust_line(
        &self,
        a: &AccountId,
        b: &AccountId,
        currency: &Currency,
    ) -> EngineResult<Option<TrustLine>> {
        match self.read(&keylet::trust_line(a, b, currency))? {
            Some(LedgerEntry::TrustLine(line)) => Ok(Some(line)),
            Some(other) => Err(self.wrong_kind("trust line", other.kind())),
            None => Ok(None),
        }
    }

    pub fn put_trust_line(&mut self, line: TrustLine) {
        let key = keylet::trust_line(&line.low, &line.high, &line.currency);
        self.put(key, LedgerEntry::TrustLine(line));
    }

    pub fn erase_trust_line(&mut self, line: &TrustLine) {
        self.erase(keylet::trust_line(&line.low, &line.high, &line.currency));
    }

    pub fn offer(&self, owner: &AccountId, sequence: u32) -> EngineResult<Option<Offer>> {
        match self.read(&keylet::offer(owner, sequence))? {
            Some(LedgerEntry::Offer(offer)) => Ok(Some(offer)),
            Some(other) => Err(self.wrong_kind("offer", other.kind())),
            None => Ok(None),
        }
    }

    /// Take fee drops out of existence when the changes are committed.
    pub fn destroy(&mut self, drops: Drops) -> EngineResult<()> {
        self.destroyed = self
            .destroyed
            .checked_add(drops)
            .ok_or(EngineError::DeltaOverflow)?;
        Ok(())
    }

    fn wrong_kind(&self, expected: &str, found: &str) -> EngineError {
        EngineError::Ledger(LedgerError::IntegrityViolation {
            seq: self.base.sequence(),
            reason: format!("{expected} key holds a {found} entry"),
        })
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    /// Net balance movements of every touched account and trust line, in
    /// entry key order.
    pub fn deltas(&self) -> EngineResult<Vec<BalanceDelta>> {
        let mut deltas = Vec::new();
        for (key, after) in &self.changes {
            let before = self.base.read_entry(key)?;
            match (before.as_ref(), after.as_ref()) {
                (Some(LedgerEntry::AccountRoot(root)), _)
                | (None, Some(LedgerEntry::AccountRoot(root))) => {
                    let old = account_balance(before.as_ref());
                    let new = account_balance(after.as_ref());
                    if old != new {
                        let change = i64::try_from(i128::from(new) - i128::from(old))
                            .map_err(|_| EngineError::DeltaOverflow)?;
                        deltas.push(BalanceDelta {
                            account: root.account,
                            asset: Asset::Native,
                            change: BalanceChange::Drops(change),
                        });
                    }
                }
                (Some(LedgerEntry::TrustLine(line)), _)
                | (None, Some(LedgerEntry::TrustLine(line))) => {
                    let old = line_balance(before.as_ref());
                    let new = line_balance(after.as_ref());
                    if old != new {
                        let change = new.checked_sub(&old)?;
                        deltas.push(BalanceDelta {
                            account: line.low,
                            asset: Asset::Issued {
                                currency: line.currency,
                                issuer: line.high,
                            },
                            change: BalanceChange::Issued(change),
                        });
                        deltas.push(BalanceDelta {
                            account: line.high,
                            asset: Asset::Issued {
                                currency: line.currency,
                                issuer: line.low,
                            },
                            change: BalanceChange::Issued(change.negate()),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(deltas)
    }

    /// Encode the buffered writes, ending the borrow of the ledger.
    pub fn into_changes(self) -> EngineResult<SandboxChanges> {
        let mut writes = Vec::with_capacity(self.changes.len());
        for (key, entry) in self.changes {
            let encoded = entry.as_ref().map(LedgerEntry::encode).transpose()?;
            writes.push((key, encoded));
        }
        Ok(SandboxChanges {
            writes,
            destroyed: self.destroyed,
        })
    }
}

fn account_balance(entry: Option<&LedgerEntry>) -> u64 {
    match entry {
        Some(LedgerEntry::AccountRoot(root)) => root.balance.value(),
        _ => 0,
    }
}

fn line_balance(entry: Option<&LedgerEntry>) -> IouValue {
    match entry {
        Some(LedgerEntry::TrustLine(line)) => line.balance,
        _ => IouValue::zero(),
    }
}

/// Encoded sandbox writes, ready to apply to the ledger they were read from.
#[derive(Debug)]
pub struct SandboxChanges {
    writes: Vec<(Hash256, Option<Vec<u8>>)>,
    destroyed: Drops,
}

impl SandboxChanges {
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply every write and burn the destroyed drops.
    pub fn commit(self, ledger: &mut Ledger) -> EngineResult<()> {
        if !self.destroyed.is_zero() {
            ledger.destroy_drops(self.destroyed)?;
        }
        for (key, write) in self.writes {
            match write {
                Some(bytes) => ledger.put_encoded(key, bytes)?,
                None if ledger.state_tree().contains(&key) => ledger.remove_entry(&key)?,
                None => {}
            }
        }
        Ok(())
    }
}
