use rcl_crypto::KeyError;
use rcl_ledger::LedgerError;
use rcl_types::{Hash256, TypeError};

use crate::result::TxCode;
use crate::transaction::SignError;

/// Infrastructure failures while applying a transaction.
///
/// Transaction outcomes, including every rejection, are [`TxCode`]s and
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("amount arithmetic failed: {0}")]
    Amount(#[from] TypeError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("balance change does not fit in a signed delta")]
    DeltaOverflow,
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of a ledger close.
#[derive(Debug, thiserror::Error)]
pub enum CloseError {
    /// The store refused the flush. The ledger was not closed.
    #[error("storage failure during close: {0}")]
    Storage(LedgerError),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Engine(EngineError),
}

impl From<LedgerError> for CloseError {
    fn from(err: LedgerError) -> Self {
        if err.is_storage() {
            Self::Storage(err)
        } else {
            Self::Ledger(err)
        }
    }
}

impl From<EngineError> for CloseError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Ledger(inner) => inner.into(),
            other => Self::Engine(other),
        }
    }
}

/// Failures of the scripted genesis scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("key derivation failed: {0}")]
    Key(#[from] KeyError),

    #[error("invalid amount: {0}")]
    Amount(#[from] TypeError),

    #[error("signing failed: {0}")]
    Sign(#[from] SignError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Close(#[from] CloseError),

    #[error("no scenario account named '{0}'")]
    UnknownAccount(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("step '{step}' was rejected with {code}")]
    Rejected { step: String, code: TxCode },

    #[error("transaction {0} was dropped at close")]
    Dropped(Hash256),
}
