//! A scripted network history starting from genesis.
//!
//! [`Scenario`] owns an in-memory store, a manual clock, the last closed
//! ledger and the open ledger built on it. Steps are signed, applied to the
//! open ledger, and replayed in canonical order when the round closes.

use std::sync::Arc;

use rcl_crypto::{KeyPair, Seed, SignatureAlgorithm};
use rcl_ledger::{FixedClock, Ledger, LedgerConfig};
use rcl_store::{InMemoryNodeStore, NodeStore};
use rcl_types::{AccountId, Amount, Drops, Hash256};
use serde::Serialize;
use tracing::info;

use crate::close::{CloseReport, LedgerCloser};
use crate::config::EngineConfig;
use crate::engine::{ApplyResult, TransactionEngine, ValidationMode};
use crate::error::{EngineResult, ScenarioError};
use crate::transaction::{Transaction, ASF_GLOBAL_FREEZE, TF_CLEAR_NO_RIPPLE};

/// Passphrase every scenario account is derived from.
pub const SCENARIO_PASSPHRASE: &str = "masterpassphrase";

/// Scenario accounts in derivation-index order. The first is the genesis
/// master account.
pub const ACCOUNT_NAMES: [&str; 6] = ["master", "gw1", "gw2", "gw3", "alice", "mark"];

/// Whole XRP the master sends to each funded account in round one.
pub const FUNDING_XRP: [(&str, u64); 5] = [
    ("gw1", 5000),
    ("gw2", 4000),
    ("gw3", 3000),
    ("alice", 2000),
    ("mark", 1000),
];

// ---------------------------------------------------------------------------
// TestAccount
// ---------------------------------------------------------------------------

/// A named secp256k1 account that numbers its own transactions.
#[derive(Debug)]
pub struct TestAccount {
    name: String,
    keys: KeyPair,
    sequence: u32,
}

impl TestAccount {
    /// Derive account `index` from [`SCENARIO_PASSPHRASE`].
    pub fn derive(name: impl Into<String>, index: u32) -> Result<Self, ScenarioError> {
        let seed = Seed::from_passphrase(SCENARIO_PASSPHRASE)?;
        let keys = KeyPair::derive_with_index(&seed, SignatureAlgorithm::Secp256k1, index)?;
        Ok(Self {
            name: name.into(),
            keys,
            sequence: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn id(&self) -> AccountId {
        self.keys.account_id()
    }

    /// Sequence of the last transaction handed out.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Claim the next sequence number.
    pub fn next_sequence(&mut self) -> u32 {
        self.sequence += 1;
        self.sequence
    }

    /// Give back the last claimed sequence number after a rejection.
    pub fn release_sequence(&mut self) {
        self.sequence = self.sequence.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Round summaries
// ---------------------------------------------------------------------------

/// One closed round of the scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub sequence: u32,
    pub hash: Hash256,
    pub account_hash: Hash256,
    pub close_time: u64,
    pub applied: usize,
    pub passes: usize,
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

pub struct Scenario {
    closer: LedgerCloser,
    clock: Arc<FixedClock>,
    store: Arc<InMemoryNodeStore>,
    accounts: Vec<TestAccount>,
    fee: Drops,
    resolution: u32,
    closed: Ledger,
    open: Ledger,
    rounds: u32,
}

impl Scenario {
    /// Create and close the genesis ledger, funding the master account with
    /// every native drop, and open ledger two on top of it.
    pub fn new(
        engine_config: EngineConfig,
        ledger_config: LedgerConfig,
        start_network_time: u64,
    ) -> Result<Self, ScenarioError> {
        let accounts = ACCOUNT_NAMES
            .iter()
            .zip(0u32..)
            .map(|(name, index)| TestAccount::derive(*name, index))
            .collect::<Result<Vec<_>, _>>()?;

        let fee = Drops::new(engine_config.base_fee);
        let resolution = ledger_config.close_time_resolution;
        let genesis_drops = Drops::new(ledger_config.genesis_drops);
        let clock = Arc::new(FixedClock::at_network_time(start_network_time));
        let store = Arc::new(InMemoryNodeStore::new());
        let closer = LedgerCloser::new(
            TransactionEngine::with_default_transactors(engine_config),
            ledger_config,
            clock.clone(),
            store.clone(),
        );

        let mut closed = Ledger::genesis(&accounts[0].id(), genesis_drops)?;
        closer.close_genesis(&mut closed)?;
        let open = Ledger::open_from(&closed)?;

        Ok(Self {
            closer,
            clock,
            store,
            accounts,
            fee,
            resolution,
            closed,
            open,
            rounds: 0,
        })
    }

    pub fn closed(&self) -> &Ledger {
        &self.closed
    }

    pub fn open(&self) -> &Ledger {
        &self.open
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &FixedClock {
        &self.clock
    }

    pub fn engine(&self) -> &TransactionEngine {
        self.closer.engine()
    }

    pub fn fee(&self) -> Drops {
        self.fee
    }

    pub fn accounts(&self) -> &[TestAccount] {
        &self.accounts
    }

    pub fn account(&self, name: &str) -> Option<&TestAccount> {
        self.accounts.iter().find(|account| account.name == name)
    }

    /// Account id of a scenario account.
    pub fn id(&self, name: &str) -> Result<AccountId, ScenarioError> {
        self.account(name)
            .map(TestAccount::id)
            .ok_or_else(|| ScenarioError::UnknownAccount(name.to_string()))
    }

    fn account_mut(&mut self, name: &str) -> Result<&mut TestAccount, ScenarioError> {
        self.accounts
            .iter_mut()
            .find(|account| account.name == name)
            .ok_or_else(|| ScenarioError::UnknownAccount(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Apply `tx` to the open ledger with full validation, without treating
    /// a rejection as an error.
    pub fn try_submit(&mut self, tx: &Transaction) -> EngineResult<ApplyResult> {
        self.closer
            .engine()
            .apply(&mut self.open, tx, ValidationMode::Full)
    }

    /// Apply `tx`; any outcome but success fails the step.
    pub fn submit(&mut self, step: &str, tx: Transaction) -> Result<ApplyResult, ScenarioError> {
        let result = self.try_submit(&tx)?;
        if !result.is_success() {
            return Err(ScenarioError::Rejected {
                step: step.to_string(),
                code: result.code,
            });
        }
        info!(step, tx = %result.id.short_hex(), "applied scenario step");
        Ok(result)
    }

    /// Sign `build(sequence, fee)` with `name`'s keys and submit it.
    pub fn submit_as(
        &mut self,
        name: &str,
        step: &str,
        build: impl FnOnce(&KeyPair, u32, Drops) -> Transaction,
    ) -> Result<ApplyResult, ScenarioError> {
        let fee = self.fee;
        let account = self.account_mut(name)?;
        let sequence = account.next_sequence();
        let signed = build(&account.keys, sequence, fee).sign(&account.keys);
        let result = match signed {
            Ok(tx) => self.submit(step, tx),
            Err(err) => Err(err.into()),
        };
        if result.is_err() {
            self.account_mut(name)?.release_sequence();
        }
        result
    }

    pub fn pay(&mut self, from: &str, to: &str, amount: Amount) -> Result<ApplyResult, ScenarioError> {
        let destination = self.id(to)?;
        let step = format!("{from} pays {to} {amount}");
        self.submit_as(from, &step, |keys, seq, fee| {
            Transaction::payment(keys.public_key().clone(), seq, fee, destination, amount)
        })
    }

    /// Trust `issuer` for up to `limit` of `currency`, clearing no-ripple
    /// on the holder's side.
    pub fn trust(
        &mut self,
        holder: &str,
        issuer: &str,
        limit: &str,
        currency: &str,
    ) -> Result<ApplyResult, ScenarioError> {
        let limit = Amount::issued(limit, currency, self.id(issuer)?)?;
        let step = format!("{holder} trusts {issuer} for {limit}");
        self.submit_as(holder, &step, |keys, seq, fee| {
            Transaction::trust_set(keys.public_key().clone(), seq, fee, limit)
                .with_flags(TF_CLEAR_NO_RIPPLE)
        })
    }

    /// Place an offer; returns the offer's sequence number.
    pub fn offer(
        &mut self,
        owner: &str,
        taker_pays: Amount,
        taker_gets: Amount,
    ) -> Result<u32, ScenarioError> {
        let step = format!("{owner} offers {taker_gets} for {taker_pays}");
        self.submit_as(owner, &step, |keys, seq, fee| {
            Transaction::offer_create(keys.public_key().clone(), seq, fee, taker_pays, taker_gets)
        })?;
        Ok(self.account_mut(owner)?.sequence())
    }

    pub fn cancel_offer(&mut self, owner: &str, offer_sequence: u32) -> Result<ApplyResult, ScenarioError> {
        let step = format!("{owner} cancels offer {offer_sequence}");
        self.submit_as(owner, &step, |keys, seq, fee| {
            Transaction::offer_cancel(keys.public_key().clone(), seq, fee, offer_sequence)
        })
    }

    pub fn set_account_flag(&mut self, name: &str, flag: u32) -> Result<ApplyResult, ScenarioError> {
        let step = format!("{name} sets account flag {flag}");
        self.submit_as(name, &step, |keys, seq, fee| {
            Transaction::account_set(keys.public_key().clone(), seq, fee).with_set_flag(flag)
        })
    }

    // -----------------------------------------------------------------------
    // Closing
    // -----------------------------------------------------------------------

    /// Advance the clock by one resolution step, close the open ledger and
    /// open the next one. A transaction left out of the close fails the
    /// round.
    pub fn close(&mut self) -> Result<CloseReport, ScenarioError> {
        self.clock.advance(u64::from(self.resolution));
        let outcome = self.closer.close_and_advance(&self.open, &self.closed)?;
        if let Some((id, _)) = outcome.report.dropped.first() {
            return Err(ScenarioError::Dropped(*id));
        }
        self.open = Ledger::open_from(&outcome.ledger)?;
        self.closed = outcome.ledger;
        self.rounds += 1;
        Ok(outcome.report)
    }

    fn close_round(&mut self) -> Result<RoundSummary, ScenarioError> {
        let report = self.close()?;
        let header = self.closed.header();
        let summary = RoundSummary {
            round: self.rounds,
            sequence: header.sequence,
            hash: self.closed.hash(),
            account_hash: header.account_hash,
            close_time: header.close_time,
            applied: report.applied.len(),
            passes: report.passes,
        };
        info!(
            round = summary.round,
            seq = summary.sequence,
            hash = %summary.hash.short_hex(),
            applied = summary.applied,
            "closed scenario round"
        );
        Ok(summary)
    }

    /// Run the four scripted rounds and return one summary per close.
    ///
    /// 1. The master funds the gateways, alice and mark.
    /// 2. Alice and mark trust the gateways for FOO; the gateways issue
    ///    fractions of a unit.
    /// 3. Mark places two cross-gateway offers and cancels the second;
    ///    alice freezes her account globally.
    /// 4. Alice pays mark one XRP.
    pub fn run_genesis_scenario(&mut self) -> Result<Vec<RoundSummary>, ScenarioError> {
        let mut rounds = Vec::with_capacity(4);

        for (name, xrp) in FUNDING_XRP {
            self.pay("master", name, Amount::Native(Drops::from_xrp(xrp)))?;
        }
        rounds.push(self.close_round()?);

        self.trust("alice", "gw1", "1", "FOO")?;
        self.trust("mark", "gw2", "1", "FOO")?;
        self.trust("mark", "gw3", "1", "FOO")?;
        let (alice, mark) = (self.id("alice")?, self.id("mark")?);
        self.pay("gw2", "mark", Amount::issued(".1", "FOO", mark)?)?;
        self.pay("gw3", "mark", Amount::issued(".2", "FOO", mark)?)?;
        self.pay("gw1", "alice", Amount::issued(".3", "FOO", alice)?)?;
        rounds.push(self.close_round()?);

        let (gw1, gw2, gw3) = (self.id("gw1")?, self.id("gw2")?, self.id("gw3")?);
        self.offer(
            "mark",
            Amount::issued("1", "FOO", gw1)?,
            Amount::issued("1", "FOO", gw2)?,
        )?;
        let second = self.offer(
            "mark",
            Amount::issued("1", "FOO", gw2)?,
            Amount::issued("1", "FOO", gw3)?,
        )?;
        self.cancel_offer("mark", second)?;
        self.set_account_flag("alice", ASF_GLOBAL_FREEZE)?;
        rounds.push(self.close_round()?);

        self.pay("alice", "mark", Amount::Native(Drops::from_xrp(1)))?;
        rounds.push(self.close_round()?);

        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TxCode;

    fn scenario() -> Scenario {
        Scenario::new(EngineConfig::default(), LedgerConfig::default(), 1_000_020).unwrap()
    }

    #[test]
    fn accounts_are_distinct() {
        let s = scenario();
        let mut ids: Vec<_> = s.accounts().iter().map(TestAccount::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), ACCOUNT_NAMES.len());
        assert_eq!(s.closed().sequence(), 1);
        assert_eq!(s.open().sequence(), 2);
    }

    #[test]
    fn rejected_step_releases_its_sequence() {
        let mut s = scenario();
        let err = s
            .pay("alice", "mark", Amount::native(1_000_000))
            .unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Rejected {
                code: TxCode::NoAccount,
                ..
            }
        ));
        assert_eq!(s.account("alice").unwrap().sequence(), 0);
    }

    #[test]
    fn close_advances_by_resolution() {
        let mut s = scenario();
        s.pay("master", "alice", Amount::Native(Drops::from_xrp(10)))
            .unwrap();
        let report = s.close().unwrap();
        assert_eq!(report.applied.len(), 1);
        assert_eq!(s.closed().sequence(), 2);
        assert_eq!(s.closed().close_time(), 1_000_050);
        assert_eq!(s.open().sequence(), 3);
    }
}
