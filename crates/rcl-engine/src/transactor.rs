use rcl_types::{Amount, Drops};

use crate::error::EngineResult;
use crate::result::TxCode;
use crate::sandbox::Sandbox;
use crate::transaction::Transaction;

/// Type-specific half of transaction application.
///
/// The engine runs the checks common to every type (fee, signature,
/// sequence, fee coverage), then calls [`Transactor::preflight`] and
/// [`Transactor::apply`] for the transaction's type. After a successful
/// `apply` the engine charges the fee and bumps the sequence in the same
/// sandbox.
///
/// Object-safe and `Send + Sync` so the engine can hold one
/// `Box<dyn Transactor>` per type.
pub trait Transactor: Send + Sync {
    /// Human-readable name, e.g. `"payment"`.
    fn name(&self) -> &'static str;

    /// Structural checks that need no ledger state.
    fn preflight(&self, tx: &Transaction) -> Result<(), TxCode>;

    /// Check ledger rules and stage the effects in `view`.
    ///
    /// Any code but [`TxCode::Success`] discards `view`.
    fn apply(&self, tx: &Transaction, view: &mut Sandbox<'_>) -> EngineResult<TxCode>;
}

/// A required amount field, present and strictly positive.
pub(crate) fn positive_amount(field: Option<&Amount>) -> Result<&Amount, TxCode> {
    let amount = field.ok_or(TxCode::MissingField)?;
    if !amount.is_positive() {
        return Err(TxCode::BadAmount);
    }
    Ok(amount)
}

/// Native drops a source needs beyond `fee` to keep `amount` spendable.
pub(crate) fn native_cost(amount: Drops, fee: Drops) -> Option<Drops> {
    amount.checked_add(fee)
}

/// Unwrap a check into an early-returned [`TxCode`].
macro_rules! check {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(code) => return Ok(code),
        }
    };
}

pub(crate) use check;
