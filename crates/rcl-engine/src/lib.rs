//! Transaction engine and ledger close loop.
//!
//! The [`TransactionEngine`] applies one signed [`Transaction`] to an open
//! ledger through a pipeline of per-type [`Transactor`]s. Each application
//! either commits in full or leaves the ledger untouched, and its outcome
//! is a [`TxCode`] rather than an error.
//!
//! A [`LedgerCloser`] re-applies a [`CanonicalTxSet`] on top of the last
//! closed ledger, retrying retriable transactions until nothing more
//! applies, then seals, persists and closes the result.
//!
//! # Quick Start
//!
//! ```rust
//! use rcl_engine::{EngineConfig, Scenario};
//! use rcl_ledger::LedgerConfig;
//!
//! let mut scenario =
//!     Scenario::new(EngineConfig::default(), LedgerConfig::default(), 1_000_020).unwrap();
//! let rounds = scenario.run_genesis_scenario().unwrap();
//! assert_eq!(rounds.len(), 4);
//! assert_eq!(scenario.closed().sequence(), 5);
//! ```

pub mod canonical;
pub mod close;
pub mod config;
pub mod engine;
pub mod error;
pub mod result;
pub mod sandbox;
pub mod scenario;
pub mod transaction;
pub mod transactor;
pub mod transactors;

// Re-exports for convenience.
pub use canonical::{CanonicalKey, CanonicalTxSet, PendingTx};
pub use close::{close_time_for, CloseOutcome, CloseReport, LedgerCloser};
pub use config::EngineConfig;
pub use engine::{ApplyResult, TransactionEngine, ValidationMode};
pub use error::{CloseError, EngineError, EngineResult, ScenarioError};
pub use result::{OutcomeClass, TxCode};
pub use sandbox::{BalanceChange, BalanceDelta, Sandbox, SandboxChanges};
pub use scenario::{RoundSummary, Scenario, TestAccount, ACCOUNT_NAMES, SCENARIO_PASSPHRASE};
pub use transaction::{
    SignError, Transaction, TxMeta, TxRecord, TxType, ASF_DEFAULT_RIPPLE, ASF_GLOBAL_FREEZE,
    ASF_NO_FREEZE, TF_CLEAR_FREEZE, TF_CLEAR_NO_RIPPLE, TF_SET_FREEZE, TF_SET_NO_RIPPLE,
};
pub use transactor::Transactor;
pub use transactors::{
    AccountSetTransactor, OfferCancelTransactor, OfferCreateTransactor, PaymentTransactor,
    TrustSetTransactor,
};
