use std::collections::HashMap;
use std::sync::Arc;

use rcl_ledger::{round_close_time, CloseClock, Ledger, LedgerConfig};
use rcl_store::NodeStore;
use rcl_types::Hash256;
use tracing::{debug, info, warn};

use crate::canonical::CanonicalTxSet;
use crate::engine::{TransactionEngine, ValidationMode};
use crate::error::CloseError;
use crate::result::{OutcomeClass, TxCode};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to the transactions of one close.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloseReport {
    /// Applied transactions, in application order.
    pub applied: Vec<Hash256>,
    /// Transactions left out, with the code that excluded them. Ones still
    /// retriable when the loop stopped carry their last retriable code.
    pub dropped: Vec<(Hash256, TxCode)>,
    /// Passes over the canonical set.
    pub passes: usize,
}

/// A closed ledger and how it was built.
#[derive(Debug)]
pub struct CloseOutcome {
    pub ledger: Ledger,
    pub report: CloseReport,
}

/// Close time for a ledger whose parent closed at `parent_close_time`.
///
/// The clock reading is rounded to `resolution`. A result not after the
/// parent is replaced by `parent_close_time + 1` and reported as incorrect.
pub fn close_time_for(now: u64, resolution: u32, parent_close_time: u64) -> (u64, bool) {
    let rounded = round_close_time(now, resolution);
    if rounded <= parent_close_time {
        (parent_close_time + 1, false)
    } else {
        (rounded, true)
    }
}

// ---------------------------------------------------------------------------
// LedgerCloser
// ---------------------------------------------------------------------------

/// Turns a set of pending transactions and a closed parent into the next
/// closed ledger.
///
/// Transactions are applied in canonical order, pass after pass, until
/// the set is empty or a pass applies nothing. The result is then sealed
/// with the clock's rounded time, flushed to the store and closed. A store
/// failure aborts the close and leaves the ledger unclosed.
pub struct LedgerCloser {
    engine: TransactionEngine,
    config: LedgerConfig,
    clock: Arc<dyn CloseClock>,
    store: Arc<dyn NodeStore>,
}

impl LedgerCloser {
    pub fn new(
        engine: TransactionEngine,
        config: LedgerConfig,
        clock: Arc<dyn CloseClock>,
        store: Arc<dyn NodeStore>,
    ) -> Self {
        Self {
            engine,
            config,
            clock,
            store,
        }
    }

    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    /// Seal, persist and close the genesis ledger at time zero.
    pub fn close_genesis(&self, genesis: &mut Ledger) -> Result<(), CloseError> {
        genesis.seal(0, self.config.close_time_resolution, true)?;
        genesis.flush(self.store.as_ref())?;
        genesis.mark_closed()?;
        info!(hash = %genesis.hash().short_hex(), "closed genesis ledger");
        Ok(())
    }

    /// Re-apply the transactions recorded in `open` on top of `parent` and
    /// close the result.
    pub fn close_and_advance(
        &self,
        open: &Ledger,
        parent: &Ledger,
    ) -> Result<CloseOutcome, CloseError> {
        let set = CanonicalTxSet::from_ledger(open)?;
        self.close_set(set, parent)
    }

    /// Apply `set` on top of `parent` and close the result.
    pub fn close_set(
        &self,
        mut set: CanonicalTxSet,
        parent: &Ledger,
    ) -> Result<CloseOutcome, CloseError> {
        let mut ledger = Ledger::open_from(parent)?;
        debug!(
            seq = ledger.sequence(),
            pending = set.len(),
            set = %set.set_hash().short_hex(),
            "closing ledger"
        );

        let report = self.apply_set(&mut set, &mut ledger)?;
        self.finalize(&mut ledger, parent)?;

        info!(
            seq = ledger.sequence(),
            hash = %ledger.hash().short_hex(),
            close_time = ledger.close_time(),
            applied = report.applied.len(),
            dropped = report.dropped.len(),
            passes = report.passes,
            "closed ledger"
        );
        Ok(CloseOutcome { ledger, report })
    }

    /// The retry loop. Never runs more passes than there are transactions.
    fn apply_set(
        &self,
        set: &mut CanonicalTxSet,
        ledger: &mut Ledger,
    ) -> Result<CloseReport, CloseError> {
        let mut report = CloseReport::default();
        let mut last_codes: HashMap<Hash256, TxCode> = HashMap::new();
        let mut max_passes = set.len().max(1);
        if let Some(limit) = self.engine.config().max_passes {
            max_passes = max_passes.min(limit);
        }

        while !set.is_empty() && report.passes < max_passes {
            report.passes += 1;
            let mut successes = 0;
            for key in set.keys() {
                let Some(pending) = set.get(&key) else {
                    continue;
                };
                let tx = pending.tx.clone();
                let result = self.engine.apply(ledger, &tx, ValidationMode::Full)?;
                match result.class() {
                    OutcomeClass::Success => {
                        set.remove(&key);
                        report.applied.push(result.id);
                        successes += 1;
                    }
                    OutcomeClass::Retriable => {
                        set.record_retry(&key);
                        last_codes.insert(result.id, result.code);
                    }
                    OutcomeClass::Malformed
                    | OutcomeClass::BadSignature
                    | OutcomeClass::Permanent => {
                        set.remove(&key);
                        report.dropped.push((result.id, result.code));
                    }
                }
            }
            debug!(
                pass = report.passes,
                successes,
                remaining = set.len(),
                "finished close pass"
            );
            if successes == 0 {
                break;
            }
        }

        for (key, pending) in set.iter() {
            let code = last_codes
                .get(&key.id())
                .copied()
                .unwrap_or(TxCode::FutureSequence);
            warn!(
                tx = %key.id().short_hex(),
                retries = pending.retries,
                %code,
                "dropping transaction still retriable at close"
            );
            report.dropped.push((key.id(), code));
        }
        Ok(report)
    }

    fn finalize(&self, ledger: &mut Ledger, parent: &Ledger) -> Result<(), CloseError> {
        ledger.update_skip_list()?;
        let resolution = self.config.close_time_resolution;
        let (close_time, correct) =
            close_time_for(self.clock.network_now(), resolution, parent.close_time());
        ledger.seal(close_time, resolution, correct)?;
        ledger.flush(self.store.as_ref())?;
        ledger.mark_closed()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::transaction::Transaction;
    use rcl_crypto::{KeyPair, Seed, SignatureAlgorithm};
    use rcl_ledger::FixedClock;
    use rcl_store::{InMemoryNodeStore, NodeClass};
    use rcl_types::{AccountId, Amount, Drops};

    struct Harness {
        closer: LedgerCloser,
        store: Arc<InMemoryNodeStore>,
        clock: Arc<FixedClock>,
        master: KeyPair,
        genesis: Ledger,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryNodeStore::new());
        let clock = Arc::new(FixedClock::at_network_time(1_000_020));
        let seed = Seed::from_passphrase("masterpassphrase").unwrap();
        let master = KeyPair::derive(&seed, SignatureAlgorithm::Secp256k1).unwrap();
        let closer = LedgerCloser::new(
            TransactionEngine::with_default_transactors(EngineConfig::default()),
            LedgerConfig::default(),
            clock.clone(),
            store.clone(),
        );
        let mut genesis = Ledger::genesis(&master.account_id(), Drops::from_xrp(100_000)).unwrap();
        closer.close_genesis(&mut genesis).unwrap();
        Harness {
            closer,
            store,
            clock,
            master,
            genesis,
        }
    }

    fn dest(index: u8) -> AccountId {
        AccountId::from_public_key(&[index])
    }

    fn payment(master: &KeyPair, seq: u32) -> Transaction {
        Transaction::payment(
            master.public_key().clone(),
            seq,
            Drops::new(10),
            dest(seq as u8),
            Amount::Native(Drops::from_xrp(10)),
        )
        .sign(master)
        .unwrap()
    }

    fn set_of(txs: Vec<Transaction>) -> CanonicalTxSet {
        let mut set = CanonicalTxSet::new(Hash256::digest(b"pending"));
        for tx in txs {
            set.insert(tx).unwrap();
        }
        set
    }

    #[test]
    fn close_time_rounding() {
        assert_eq!(close_time_for(1_000_014, 30, 0), (1_000_020, true));
        assert_eq!(close_time_for(1_000_014, 30, 1_000_020), (1_000_021, false));
        assert_eq!(close_time_for(0, 30, 0), (1, false));
    }

    #[test]
    fn genesis_is_persisted() {
        let h = harness();
        assert!(h.genesis.is_closed());
        assert_eq!(h.genesis.close_time(), 0);
        assert_eq!(h.store.count_by_class(NodeClass::LedgerHeader), 1);
        assert!(h.store.count_by_class(NodeClass::AccountNode) > 0);
    }

    #[test]
    fn out_of_order_sequences_converge() {
        let h = harness();
        let txs: Vec<_> = (1..=6).map(|seq| payment(&h.master, seq)).collect();
        let outcome = h.closer.close_set(set_of(txs), &h.genesis).unwrap();

        assert_eq!(outcome.report.applied.len(), 6);
        assert!(outcome.report.dropped.is_empty());
        assert!(outcome.report.passes <= 6);
        let ledger = &outcome.ledger;
        assert!(ledger.is_closed());
        assert_eq!(ledger.sequence(), 2);
        assert_eq!(ledger.transaction_count(), 6);
        assert_eq!(
            ledger.account(&h.master.account_id()).unwrap().unwrap().sequence,
            6
        );
        ledger.assert_sane().unwrap();
    }

    #[test]
    fn failures_are_dropped_and_loop_terminates() {
        let h = harness();
        let unsigned = Transaction::payment(
            h.master.public_key().clone(),
            1,
            Drops::new(10),
            dest(40),
            Amount::native(1),
        );
        let unreachable = payment(&h.master, 9);
        let good = payment(&h.master, 1);
        let ids = (
            unsigned.id().unwrap(),
            unreachable.id().unwrap(),
            good.id().unwrap(),
        );
        let outcome = h
            .closer
            .close_set(set_of(vec![unsigned, unreachable, good]), &h.genesis)
            .unwrap();
        let report = outcome.report;

        assert_eq!(report.applied, vec![ids.2]);
        assert!(report.passes <= 3);
        assert!(report.dropped.contains(&(ids.0, TxCode::InvalidSignature)));
        assert!(report.dropped.contains(&(ids.1, TxCode::FutureSequence)));
    }

    #[test]
    fn max_passes_caps_the_loop() {
        let store = Arc::new(InMemoryNodeStore::new());
        let h = harness();
        let closer = LedgerCloser::new(
            TransactionEngine::with_default_transactors(EngineConfig {
                max_passes: Some(1),
                ..Default::default()
            }),
            LedgerConfig::default(),
            h.clock.clone(),
            store,
        );
        let txs: Vec<_> = (1..=4).map(|seq| payment(&h.master, seq)).collect();
        let outcome = closer.close_set(set_of(txs), &h.genesis).unwrap();
        assert_eq!(outcome.report.passes, 1);
        assert_eq!(
            outcome.report.applied.len() + outcome.report.dropped.len(),
            4
        );
    }

    #[test]
    fn closing_is_deterministic() {
        let a = harness();
        let b = harness();
        assert_eq!(a.genesis.hash(), b.genesis.hash());

        let txs: Vec<_> = (1..=4).map(|seq| payment(&a.master, seq)).collect();
        let first = a.closer.close_set(set_of(txs.clone()), &a.genesis).unwrap();
        let second = b.closer.close_set(set_of(txs), &b.genesis).unwrap();
        assert_eq!(first.ledger.hash(), second.ledger.hash());
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn close_and_advance_replays_the_open_ledger() {
        let h = harness();
        let mut open = Ledger::open_from(&h.genesis).unwrap();
        for seq in 1..=3 {
            let result = h
                .closer
                .engine()
                .apply(&mut open, &payment(&h.master, seq), ValidationMode::Full)
                .unwrap();
            assert!(result.is_success());
        }
        let outcome = h.closer.close_and_advance(&open, &h.genesis).unwrap();
        assert_eq!(outcome.report.applied.len(), 3);
        assert_eq!(
            outcome.ledger.account(&dest(2)).unwrap().unwrap().balance,
            Drops::from_xrp(10)
        );
        assert_eq!(
            outcome.ledger.total_drops().value(),
            h.genesis.total_drops().value() - 30
        );
        assert_eq!(outcome.ledger.parent_hash(), h.genesis.hash());
    }

    #[test]
    fn close_times_advance() {
        let h = harness();
        let first = h.closer.close_set(CanonicalTxSet::new(Hash256::zero()), &h.genesis).unwrap();
        assert!(first.ledger.header().close_time_correct);
        assert_eq!(first.ledger.close_time(), 1_000_020);

        // same clock reading: forced one second past the parent
        let second = h.closer.close_set(CanonicalTxSet::new(Hash256::zero()), &first.ledger).unwrap();
        assert_eq!(second.ledger.close_time(), 1_000_021);
        assert!(!second.ledger.header().close_time_correct);

        h.clock.advance(60);
        let third = h.closer.close_set(CanonicalTxSet::new(Hash256::zero()), &second.ledger).unwrap();
        assert_eq!(third.ledger.close_time(), 1_000_080);
        assert!(third.ledger.header().close_time_correct);
        assert_eq!(third.ledger.ancestor_hash(2).unwrap(), Some(first.ledger.hash()));
    }

    #[test]
    fn overflowing_payment_is_dropped_and_the_close_completes() {
        let h = harness();
        let seed = Seed::from_passphrase("masterpassphrase").unwrap();
        let alice = KeyPair::derive_with_index(&seed, SignatureAlgorithm::Secp256k1, 1).unwrap();
        let gw = KeyPair::derive_with_index(&seed, SignatureAlgorithm::Secp256k1, 2).unwrap();
        let fee = Drops::new(10);
        let fund = |seq: u32, to: &KeyPair| {
            Transaction::payment(
                h.master.public_key().clone(),
                seq,
                fee,
                to.account_id(),
                Amount::Native(Drops::from_xrp(1_000)),
            )
            .sign(&h.master)
            .unwrap()
        };
        let issue = |seq: u32| {
            Transaction::payment(
                gw.public_key().clone(),
                seq,
                fee,
                alice.account_id(),
                Amount::issued("6e95", "FOO", gw.account_id()).unwrap(),
            )
            .sign(&gw)
            .unwrap()
        };

        let funded = h
            .closer
            .close_set(set_of(vec![fund(1, &alice), fund(2, &gw)]), &h.genesis)
            .unwrap();
        let trust = Transaction::trust_set(
            alice.public_key().clone(),
            1,
            fee,
            Amount::issued("9999999999999999e80", "FOO", gw.account_id()).unwrap(),
        )
        .sign(&alice)
        .unwrap();
        let issued = h
            .closer
            .close_set(set_of(vec![trust, issue(1)]), &funded.ledger)
            .unwrap();
        assert_eq!(issued.report.applied.len(), 2);

        let overflowing = issue(2);
        let native = payment(&h.master, 3);
        let ids = (overflowing.id().unwrap(), native.id().unwrap());
        let outcome = h
            .closer
            .close_set(set_of(vec![overflowing, native]), &issued.ledger)
            .unwrap();

        assert!(outcome.ledger.is_closed());
        assert_eq!(outcome.ledger.sequence(), 4);
        assert_eq!(outcome.report.applied, vec![ids.1]);
        assert_eq!(outcome.report.dropped, vec![(ids.0, TxCode::Overflow)]);
        assert_eq!(
            outcome.ledger.account(&gw.account_id()).unwrap().unwrap().sequence,
            1
        );
        outcome.ledger.assert_sane().unwrap();
    }

    #[test]
    fn store_failure_aborts_the_close() {
        let h = harness();
        h.store.set_read_only(true);
        let err = h
            .closer
            .close_set(set_of(vec![payment(&h.master, 1)]), &h.genesis)
            .unwrap_err();
        assert!(matches!(err, CloseError::Storage(_)));
    }
}
