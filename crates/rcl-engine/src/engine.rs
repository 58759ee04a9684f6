use std::collections::HashMap;

use rcl_crypto::verify;
use rcl_ledger::{Ledger, LedgerError};
use rcl_types::Hash256;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::result::{OutcomeClass, TxCode};
use crate::sandbox::{BalanceDelta, Sandbox, SandboxChanges};
use crate::transaction::{Transaction, TxMeta, TxRecord, TxType};
use crate::transactor::Transactor;
use crate::transactors::{
    AccountSetTransactor, OfferCancelTransactor, OfferCreateTransactor, PaymentTransactor,
    TrustSetTransactor,
};

/// How much checking [`TransactionEngine::apply`] performs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    #[default]
    Full,
    /// Skip signature verification. Ignored unless the engine was built
    /// with [`EngineConfig::signature_bypass`] set.
    SkipSignatures,
}

/// The outcome of applying one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyResult {
    pub id: Hash256,
    pub code: TxCode,
    /// Balance movements; empty unless `code` is success.
    pub deltas: Vec<BalanceDelta>,
}

impl ApplyResult {
    fn rejected(id: Hash256, code: TxCode) -> Self {
        Self {
            id,
            code,
            deltas: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    pub fn class(&self) -> OutcomeClass {
        self.code.class()
    }
}

/// Applies transactions to open ledgers.
///
/// Every transaction either commits all of its effects (balances, entries,
/// fee, sequence, and its record in the transaction tree) or leaves the
/// ledger untouched. Rejections are reported as [`TxCode`]s; `Err` means
/// the ledger itself could not be read or written.
pub struct TransactionEngine {
    transactors: HashMap<TxType, Box<dyn Transactor>>,
    config: EngineConfig,
}

impl TransactionEngine {
    /// An engine with no transactors; every type is refused until one is
    /// registered.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            transactors: HashMap::new(),
            config,
        }
    }

    /// An engine handling every transaction type.
    pub fn with_default_transactors(config: EngineConfig) -> Self {
        let mut engine = Self::new(config);
        engine.register(TxType::Payment, Box::new(PaymentTransactor));
        engine.register(TxType::TrustSet, Box::new(TrustSetTransactor));
        engine.register(TxType::OfferCreate, Box::new(OfferCreateTransactor));
        engine.register(TxType::OfferCancel, Box::new(OfferCancelTransactor));
        engine.register(TxType::AccountSet, Box::new(AccountSetTransactor));
        engine
    }

    /// Install (or replace) the transactor for one type.
    pub fn register(&mut self, tx_type: TxType, transactor: Box<dyn Transactor>) {
        self.transactors.insert(tx_type, transactor);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply `tx` to the open ledger `ledger`.
    pub fn apply(
        &self,
        ledger: &mut Ledger,
        tx: &Transaction,
        mode: ValidationMode,
    ) -> EngineResult<ApplyResult> {
        if !ledger.is_open() {
            return Err(LedgerError::NotOpen {
                seq: ledger.sequence(),
            }
            .into());
        }
        let id = tx.id()?;

        let staged = match self.stage(ledger, tx, mode)? {
            Ok(staged) => staged,
            Err(code) => {
                debug!(
                    tx = %id.short_hex(),
                    tx_type = %tx.tx_type,
                    account = %tx.account,
                    sequence = tx.sequence,
                    %code,
                    "transaction rejected"
                );
                return Ok(ApplyResult::rejected(id, code));
            }
        };

        let record = TxRecord {
            tx: tx.clone(),
            meta: TxMeta {
                result: TxCode::Success,
                index: ledger.transaction_count() as u32,
                deltas: staged.deltas.clone(),
            },
        };
        ledger.add_transaction(id, record.encode()?)?;
        staged.changes.commit(ledger)?;

        debug!(
            tx = %id.short_hex(),
            tx_type = %tx.tx_type,
            account = %tx.account,
            sequence = tx.sequence,
            ledger = ledger.sequence(),
            "transaction applied"
        );
        Ok(ApplyResult {
            id,
            code: TxCode::Success,
            deltas: staged.deltas,
        })
    }

    /// Run every check and stage the effects without touching `ledger`.
    fn stage(
        &self,
        ledger: &Ledger,
        tx: &Transaction,
        mode: ValidationMode,
    ) -> EngineResult<Result<Staged, TxCode>> {
        let Some(transactor) = self.transactors.get(&tx.tx_type) else {
            warn!(tx_type = %tx.tx_type, "no transactor registered");
            return Ok(Err(TxCode::Unsupported));
        };

        if let Err(code) = self.preflight(tx, transactor.as_ref()) {
            return Ok(Err(code));
        }
        if let Err(code) = self.check_signature(tx, mode)? {
            return Ok(Err(code));
        }

        let mut view = Sandbox::new(ledger);
        let Some(source) = view.account(&tx.account)? else {
            return Ok(Err(TxCode::NoAccount));
        };
        let expected = source.sequence.wrapping_add(1);
        if tx.sequence > expected {
            return Ok(Err(TxCode::FutureSequence));
        }
        if tx.sequence < expected {
            return Ok(Err(TxCode::PastSequence));
        }
        if source.balance < tx.fee {
            return Ok(Err(TxCode::InsufficientFunds));
        }

        let code = transactor.apply(tx, &mut view)?;
        if !code.is_success() {
            return Ok(Err(code));
        }

        // Fee and sequence, on top of whatever the transactor staged.
        let Some(mut source) = view.account(&tx.account)? else {
            return Ok(Err(TxCode::NoAccount));
        };
        let Some(balance) = source.balance.checked_sub(tx.fee) else {
            return Ok(Err(TxCode::InsufficientFunds));
        };
        source.balance = balance;
        source.sequence = tx.sequence;
        view.put_account(source);
        view.destroy(tx.fee)?;

        let deltas = match view.deltas() {
            Ok(deltas) => deltas,
            Err(EngineError::Amount(_) | EngineError::DeltaOverflow) => {
                return Ok(Err(TxCode::Overflow));
            }
            Err(err) => return Err(err),
        };
        let changes = view.into_changes()?;
        Ok(Ok(Staged { changes, deltas }))
    }

    fn preflight(&self, tx: &Transaction, transactor: &dyn Transactor) -> Result<(), TxCode> {
        if tx.fee.value() < self.config.base_fee {
            return Err(TxCode::BadFee);
        }
        if tx.sequence == 0 {
            return Err(TxCode::BadSequence);
        }
        transactor.preflight(tx)
    }

    fn check_signature(
        &self,
        tx: &Transaction,
        mode: ValidationMode,
    ) -> EngineResult<Result<(), TxCode>> {
        if tx.signing_key.account_id() != tx.account {
            return Ok(Err(TxCode::SigningKeyMismatch));
        }
        if mode == ValidationMode::SkipSignatures && self.config.signature_bypass {
            return Ok(Ok(()));
        }
        let Some(signature) = tx.signature.as_deref() else {
            return Ok(Err(TxCode::InvalidSignature));
        };
        if !verify(&tx.signing_key, &tx.signing_bytes()?, signature) {
            return Ok(Err(TxCode::InvalidSignature));
        }
        Ok(Ok(()))
    }
}

struct Staged {
    changes: SandboxChanges,
    deltas: Vec<BalanceDelta>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::BalanceChange;
    use crate::transaction::{
        ASF_DEFAULT_RIPPLE, ASF_GLOBAL_FREEZE, ASF_NO_FREEZE, TF_CLEAR_NO_RIPPLE, TF_SET_FREEZE,
    };
    use rcl_crypto::{KeyPair, Seed, SignatureAlgorithm};
    use rcl_ledger::{keylet, LedgerEntry, TrustLine};
    use rcl_types::{AccountId, Amount, Asset, Currency, Drops, Quality};

    const FEE: Drops = Drops::new(10);

    struct Actor {
        keys: KeyPair,
        seq: u32,
    }

    impl Actor {
        fn new(index: u32) -> Self {
            let seed = Seed::from_passphrase("masterpassphrase").unwrap();
            Self {
                keys: KeyPair::derive_with_index(&seed, SignatureAlgorithm::Secp256k1, index)
                    .unwrap(),
                seq: 0,
            }
        }

        fn id(&self) -> AccountId {
            self.keys.account_id()
        }

        fn next(&mut self) -> u32 {
            self.seq += 1;
            self.seq
        }

        fn sign(&self, tx: Transaction) -> Transaction {
            tx.sign(&self.keys).unwrap()
        }

        fn pay(&mut self, to: &Actor, amount: Amount) -> Transaction {
            let seq = self.next();
            self.sign(Transaction::payment(
                self.keys.public_key().clone(),
                seq,
                FEE,
                to.id(),
                amount,
            ))
        }

        fn trust(&mut self, limit: Amount, flags: u32) -> Transaction {
            let seq = self.next();
            self.sign(
                Transaction::trust_set(self.keys.public_key().clone(), seq, FEE, limit)
                    .with_flags(flags),
            )
        }
    }

    fn foo(value: &str, issuer: &Actor) -> Amount {
        Amount::issued(value, "FOO", issuer.id()).unwrap()
    }

    fn setup() -> (TransactionEngine, Ledger, Actor) {
        let master = Actor::new(0);
        let ledger = Ledger::genesis(&master.id(), Drops::from_xrp(100_000)).unwrap();
        (
            TransactionEngine::with_default_transactors(EngineConfig::default()),
            ledger,
            master,
        )
    }

    fn apply(engine: &TransactionEngine, ledger: &mut Ledger, tx: &Transaction) -> TxCode {
        engine.apply(ledger, tx, ValidationMode::Full).unwrap().code
    }

    fn fund(engine: &TransactionEngine, ledger: &mut Ledger, master: &mut Actor, to: &Actor) {
        let tx = master.pay(to, Amount::Native(Drops::from_xrp(1_000)));
        assert_eq!(apply(engine, ledger, &tx), TxCode::Success);
    }

    fn line(ledger: &Ledger, a: &Actor, b: &Actor) -> Option<TrustLine> {
        let key = keylet::trust_line(&a.id(), &b.id(), &Currency::from_code("FOO").unwrap());
        match ledger.read_entry(&key).unwrap() {
            Some(LedgerEntry::TrustLine(line)) => Some(line),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Common checks
    // -----------------------------------------------------------------------

    #[test]
    fn native_payment_creates_destination_and_burns_fee() {
        let (engine, mut ledger, mut master) = setup();
        let alice = Actor::new(1);
        let tx = master.pay(&alice, Amount::Native(Drops::from_xrp(5_000)));
        let result = engine.apply(&mut ledger, &tx, ValidationMode::Full).unwrap();

        assert!(result.is_success());
        assert_eq!(
            ledger.account(&alice.id()).unwrap().unwrap().balance,
            Drops::from_xrp(5_000)
        );
        let root = ledger.account(&master.id()).unwrap().unwrap();
        assert_eq!(root.sequence, 1);
        assert_eq!(root.balance.value(), 95_000_000_000 - 10);
        assert_eq!(ledger.total_drops().value(), 100_000_000_000 - 10);
        assert_eq!(ledger.transaction_count(), 1);
        assert!(result.deltas.contains(&BalanceDelta {
            account: alice.id(),
            asset: Asset::Native,
            change: BalanceChange::Drops(5_000_000_000),
        }));
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let (_, mut ledger, mut master) = setup();
        let engine = TransactionEngine::new(EngineConfig::default());
        let tx = master.pay(&Actor::new(1), Amount::native(1));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Unsupported);
    }

    #[test]
    fn low_fee_is_malformed() {
        let (engine, mut ledger, master) = setup();
        let tx = master.sign(Transaction::payment(
            master.keys.public_key().clone(),
            1,
            Drops::new(9),
            Actor::new(1).id(),
            Amount::native(1),
        ));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::BadFee);
    }

    #[test]
    fn payment_to_self_is_malformed() {
        let (engine, mut ledger, mut master) = setup();
        let seq = master.next();
        let tx = master.sign(Transaction::payment(
            master.keys.public_key().clone(),
            seq,
            FEE,
            master.id(),
            Amount::native(1),
        ));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Redundant);
    }

    #[test]
    fn sequence_gate() {
        let (engine, mut ledger, mut master) = setup();
        let alice = Actor::new(1);
        master.seq = 1;
        let future = master.pay(&alice, Amount::native(1_000));
        assert_eq!(apply(&engine, &mut ledger, &future), TxCode::FutureSequence);

        master.seq = 0;
        let first = master.pay(&alice, Amount::native(1_000));
        assert_eq!(apply(&engine, &mut ledger, &first), TxCode::Success);
        assert_eq!(apply(&engine, &mut ledger, &future), TxCode::Success);

        master.seq = 0;
        let replay = master.pay(&alice, Amount::native(7));
        assert_eq!(apply(&engine, &mut ledger, &replay), TxCode::PastSequence);
    }

    #[test]
    fn unsigned_transaction_is_rejected_without_effect() {
        let (engine, mut ledger, master) = setup();
        let root_before = ledger.state_tree().root_hash();
        let tx = Transaction::payment(
            master.keys.public_key().clone(),
            1,
            FEE,
            Actor::new(1).id(),
            Amount::native(1_000),
        );
        let result = engine.apply(&mut ledger, &tx, ValidationMode::Full).unwrap();
        assert_eq!(result.code, TxCode::InvalidSignature);
        assert_eq!(result.class(), OutcomeClass::BadSignature);
        assert_eq!(ledger.state_tree().root_hash(), root_before);
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[test]
    fn bypass_needs_mode_and_config() {
        let (engine, mut ledger, master) = setup();
        let tx = Transaction::payment(
            master.keys.public_key().clone(),
            1,
            FEE,
            Actor::new(1).id(),
            Amount::native(1_000),
        );
        let refused = engine
            .apply(&mut ledger, &tx, ValidationMode::SkipSignatures)
            .unwrap();
        assert_eq!(refused.code, TxCode::InvalidSignature);

        let bypass =
            TransactionEngine::with_default_transactors(EngineConfig::with_signature_bypass());
        let accepted = bypass
            .apply(&mut ledger, &tx, ValidationMode::SkipSignatures)
            .unwrap();
        assert!(accepted.is_success());
    }

    #[test]
    fn foreign_signing_key_is_rejected() {
        let (engine, mut ledger, master) = setup();
        let other = Actor::new(1);
        let mut tx = Transaction::payment(
            other.keys.public_key().clone(),
            1,
            FEE,
            other.id(),
            Amount::native(1),
        );
        tx.account = master.id();
        tx.destination = Some(Actor::new(2).id());
        let tx = other.sign(tx);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::SigningKeyMismatch);
    }

    #[test]
    fn tampered_transaction_fails_verification() {
        let (engine, mut ledger, mut master) = setup();
        let alice = Actor::new(1);
        let mut tx = master.pay(&alice, Amount::native(1_000));
        tx.amount = Some(Amount::native(2_000));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::InvalidSignature);
    }

    #[test]
    fn insufficient_native_funds_is_retriable() {
        let (engine, mut ledger, mut master) = setup();
        let alice = Actor::new(1);
        let tx = master.pay(&alice, Amount::Native(Drops::from_xrp(100_000)));
        let result = engine.apply(&mut ledger, &tx, ValidationMode::Full).unwrap();
        assert_eq!(result.code, TxCode::InsufficientFunds);
        assert_eq!(result.class(), OutcomeClass::Retriable);
    }

    #[test]
    fn unknown_source_is_retriable() {
        let (engine, mut ledger, master) = setup();
        let mut ghost = Actor::new(7);
        let tx = ghost.pay(&master, Amount::native(1));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::NoAccount);
    }

    #[test]
    fn closed_ledger_is_an_error() {
        let (engine, mut ledger, mut master) = setup();
        ledger.seal(0, 30, true).unwrap();
        let tx = master.pay(&Actor::new(1), Amount::native(1));
        assert!(engine.apply(&mut ledger, &tx, ValidationMode::Full).is_err());
    }

    // -----------------------------------------------------------------------
    // Trust lines and issued payments
    // -----------------------------------------------------------------------

    #[test]
    fn trust_set_creates_and_deletes_lines() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        let gw = Actor::new(2);
        fund(&engine, &mut ledger, &mut master, &alice);
        fund(&engine, &mut ledger, &mut master, &gw);

        let tx = alice.trust(foo("1", &gw), TF_CLEAR_NO_RIPPLE);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let created = line(&ledger, &alice, &gw).unwrap();
        assert_eq!(created.limit_of(&alice.id()), "1".parse().unwrap());
        assert!(created.no_ripple(&gw.id()));
        assert_eq!(ledger.account(&alice.id()).unwrap().unwrap().owner_count, 1);

        let tx = alice.trust(foo("0", &gw), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        assert!(line(&ledger, &alice, &gw).is_none());
        assert_eq!(ledger.account(&alice.id()).unwrap().unwrap().owner_count, 0);

        let tx = alice.trust(foo("0", &gw), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::RedundantLine);
    }

    #[test]
    fn trust_set_needs_an_existing_issuer() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        fund(&engine, &mut ledger, &mut master, &alice);
        let tx = alice.trust(foo("1", &Actor::new(9)), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::NoIssuer);
    }

    #[test]
    fn issued_payments_respect_limits() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        let mut gw = Actor::new(2);
        fund(&engine, &mut ledger, &mut master, &alice);
        fund(&engine, &mut ledger, &mut master, &gw);

        let early = gw.pay(&alice, foo(".3", &alice));
        assert_eq!(apply(&engine, &mut ledger, &early), TxCode::NoTrustLine);

        let tx = alice.trust(foo("1", &gw), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        assert_eq!(apply(&engine, &mut ledger, &early), TxCode::Success);
        let held = line(&ledger, &alice, &gw).unwrap().balance_for(&alice.id());
        assert_eq!(held, "0.3".parse().unwrap());

        let too_much = gw.pay(&alice, foo("0.8", &gw));
        assert_eq!(apply(&engine, &mut ledger, &too_much), TxCode::LimitExceeded);
    }

    #[test]
    fn issued_balance_overflow_is_a_permanent_rejection() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        let mut gw = Actor::new(2);
        fund(&engine, &mut ledger, &mut master, &alice);
        fund(&engine, &mut ledger, &mut master, &gw);

        let tx = alice.trust(foo("9999999999999999e80", &gw), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let first = gw.pay(&alice, foo("6e95", &gw));
        assert_eq!(apply(&engine, &mut ledger, &first), TxCode::Success);

        let root_before = ledger.state_tree().root_hash();
        let second = gw.pay(&alice, foo("6e95", &gw));
        let result = engine
            .apply(&mut ledger, &second, ValidationMode::Full)
            .unwrap();
        assert_eq!(result.code, TxCode::Overflow);
        assert_eq!(result.class(), OutcomeClass::Permanent);
        assert_eq!(ledger.state_tree().root_hash(), root_before);
        let held = line(&ledger, &alice, &gw).unwrap().balance_for(&alice.id());
        assert_eq!(held, "6e95".parse().unwrap());
    }

    #[test]
    fn holder_to_holder_ripples_through_issuer() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        let mut bob = Actor::new(2);
        let mut gw = Actor::new(3);
        for actor in [&alice, &bob, &gw] {
            fund(&engine, &mut ledger, &mut master, actor);
        }
        // gw allows rippling on its side of both lines
        let seq = gw.next();
        let tx = gw.sign(
            Transaction::account_set(gw.keys.public_key().clone(), seq, FEE)
                .with_set_flag(ASF_DEFAULT_RIPPLE),
        );
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);

        for actor in [&mut alice, &mut bob] {
            let tx = actor.trust(foo("10", &gw), 0);
            assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        }
        let tx = gw.pay(&alice, foo("5", &gw));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);

        let tx = alice.pay(&bob, foo("2", &gw));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        assert_eq!(
            line(&ledger, &alice, &gw).unwrap().balance_for(&alice.id()),
            "3".parse().unwrap()
        );
        assert_eq!(
            line(&ledger, &bob, &gw).unwrap().balance_for(&bob.id()),
            "2".parse().unwrap()
        );

        let tx = alice.pay(&bob, foo("4", &gw));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::InsufficientFunds);
    }

    #[test]
    fn issuer_no_ripple_blocks_holder_to_holder() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        let mut bob = Actor::new(2);
        let mut gw = Actor::new(3);
        for actor in [&alice, &bob, &gw] {
            fund(&engine, &mut ledger, &mut master, actor);
        }
        for actor in [&mut alice, &mut bob] {
            let tx = actor.trust(foo("10", &gw), 0);
            assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        }
        let tx = gw.pay(&alice, foo("5", &gw));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);

        let tx = alice.pay(&bob, foo("1", &gw));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::NoRipple);
    }

    #[test]
    fn freezes_are_permanent_failures() {
        let (engine, mut ledger, mut master) = setup();
        let mut alice = Actor::new(1);
        let mut gw = Actor::new(2);
        fund(&engine, &mut ledger, &mut master, &alice);
        fund(&engine, &mut ledger, &mut master, &gw);
        let tx = alice.trust(foo("10", &gw), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);

        // line freeze by the issuer
        let tx = gw.trust(foo("0", &alice), TF_SET_FREEZE);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let tx = gw.pay(&alice, foo("1", &gw));
        let result = engine.apply(&mut ledger, &tx, ValidationMode::Full).unwrap();
        assert_eq!(result.code, TxCode::Frozen);
        assert_eq!(result.class(), OutcomeClass::Permanent);
        gw.seq -= 1;

        // global freeze, then no-freeze makes it irrevocable
        let seq = gw.next();
        let tx = gw.sign(
            Transaction::account_set(gw.keys.public_key().clone(), seq, FEE)
                .with_set_flag(ASF_GLOBAL_FREEZE),
        );
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let seq = gw.next();
        let tx = gw.sign(
            Transaction::account_set(gw.keys.public_key().clone(), seq, FEE)
                .with_set_flag(ASF_NO_FREEZE),
        );
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let seq = gw.next();
        let tx = gw.sign(
            Transaction::account_set(gw.keys.public_key().clone(), seq, FEE)
                .with_clear_flag(ASF_GLOBAL_FREEZE),
        );
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::NoPermission);
        gw.seq -= 1;
        assert!(ledger
            .account(&gw.id())
            .unwrap()
            .unwrap()
            .is_globally_frozen());

        // native payments are unaffected
        let tx = gw.pay(&alice, Amount::native(1_000));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
    }

    #[test]
    fn unknown_account_flag_is_malformed() {
        let (engine, mut ledger, master) = setup();
        let tx = master.sign(
            Transaction::account_set(master.keys.public_key().clone(), 1, FEE).with_set_flag(99),
        );
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::InvalidFlags);
    }

    // -----------------------------------------------------------------------
    // Offers
    // -----------------------------------------------------------------------

    #[test]
    fn offers_are_placed_and_cancelled() {
        let (engine, mut ledger, mut master) = setup();
        let mut mark = Actor::new(1);
        let mut gw = Actor::new(2);
        fund(&engine, &mut ledger, &mut master, &mark);
        fund(&engine, &mut ledger, &mut master, &gw);

        let seq = mark.next();
        let unfunded = mark.sign(Transaction::offer_create(
            mark.keys.public_key().clone(),
            seq,
            FEE,
            Amount::native(1_000_000),
            foo("1", &gw),
        ));
        assert_eq!(apply(&engine, &mut ledger, &unfunded), TxCode::UnfundedOffer);
        mark.seq -= 1;

        let tx = mark.trust(foo("1", &gw), 0);
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let tx = gw.pay(&mark, foo(".1", &mark));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);

        let seq = mark.next();
        let tx = mark.sign(Transaction::offer_create(
            mark.keys.public_key().clone(),
            seq,
            FEE,
            Amount::native(1_000_000),
            foo("1", &gw),
        ));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        let offer = match ledger.read_entry(&keylet::offer(&mark.id(), seq)).unwrap() {
            Some(LedgerEntry::Offer(offer)) => offer,
            other => panic!("expected offer, got {other:?}"),
        };
        let expected = Quality::from_amounts(&foo("1", &gw), &Amount::native(1_000_000)).unwrap();
        assert_eq!(offer.quality, expected);
        assert_eq!(Quality::from_book_index(&offer.book_directory), expected);
        assert_eq!(ledger.account(&mark.id()).unwrap().unwrap().owner_count, 2);

        let cancel_seq = mark.next();
        let tx = mark.sign(Transaction::offer_cancel(
            mark.keys.public_key().clone(),
            cancel_seq,
            FEE,
            seq,
        ));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::Success);
        assert!(ledger
            .read_entry(&keylet::offer(&mark.id(), seq))
            .unwrap()
            .is_none());
        assert_eq!(ledger.account(&mark.id()).unwrap().unwrap().owner_count, 1);

        let again_seq = mark.next();
        let tx = mark.sign(Transaction::offer_cancel(
            mark.keys.public_key().clone(),
            again_seq,
            FEE,
            seq,
        ));
        assert_eq!(apply(&engine, &mut ledger, &tx), TxCode::NoSuchOffer);
    }
}
