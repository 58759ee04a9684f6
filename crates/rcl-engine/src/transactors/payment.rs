use rcl_ledger::AccountRoot;
use rcl_types::{AccountId, Amount, Drops, IssuedAmount};
use tracing::trace;

use crate::error::EngineResult;
use crate::result::TxCode;
use crate::sandbox::Sandbox;
use crate::transaction::Transaction;
use crate::transactor::{check, native_cost, positive_amount, Transactor};

/// Direct payments, native or issued. No path finding.
///
/// An issued payment whose issuer is the source or the destination moves
/// value over the single trust line between them: the destination's
/// holding grows and must stay within the destination's limit. Any other
/// issuer ripples through two lines, from the source's line with the
/// issuer to the destination's.
pub struct PaymentTransactor;

impl Transactor for PaymentTransactor {
    fn name(&self) -> &'static str {
        "payment"
    }

    fn preflight(&self, tx: &Transaction) -> Result<(), TxCode> {
        let destination = tx.destination.ok_or(TxCode::MissingField)?;
        positive_amount(tx.amount.as_ref())?;
        if destination == tx.account {
            return Err(TxCode::Redundant);
        }
        if tx.flags != 0 {
            return Err(TxCode::InvalidFlags);
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, view: &mut Sandbox<'_>) -> EngineResult<TxCode> {
        let (Some(destination), Some(amount)) = (tx.destination, tx.amount) else {
            return Ok(TxCode::MissingField);
        };
        match amount {
            Amount::Native(drops) => pay_native(tx, &destination, drops, view),
            Amount::Issued(issued) => pay_issued(tx, &destination, &issued, view),
        }
    }
}

fn pay_native(
    tx: &Transaction,
    destination: &AccountId,
    drops: Drops,
    view: &mut Sandbox<'_>,
) -> EngineResult<TxCode> {
    let mut source = check!(view.account(&tx.account)?.ok_or(TxCode::NoAccount));
    let needed = check!(native_cost(drops, tx.fee).ok_or(TxCode::BadAmount));
    if source.balance < needed {
        return Ok(TxCode::InsufficientFunds);
    }
    source.balance = check!(source.balance.checked_sub(drops).ok_or(TxCode::InsufficientFunds));

    let mut dest = view
        .account(destination)?
        .unwrap_or_else(|| AccountRoot::new(*destination, Drops::ZERO));
    dest.balance = check!(dest.balance.checked_add(drops).ok_or(TxCode::BadAmount));

    trace!(from = %tx.account, to = %destination, drops = drops.value(), "native payment");
    view.put_account(source);
    view.put_account(dest);
    Ok(TxCode::Success)
}

fn pay_issued(
    tx: &Transaction,
    destination: &AccountId,
    amount: &IssuedAmount,
    view: &mut Sandbox<'_>,
) -> EngineResult<TxCode> {
    let source = tx.account;
    let issuer = amount.issuer;

    let issuer_root = check!(view.account(&issuer)?.ok_or(TxCode::NoIssuer));
    let source_root = check!(view.account(&source)?.ok_or(TxCode::NoAccount));
    if issuer_root.is_globally_frozen() || source_root.is_globally_frozen() {
        return Ok(TxCode::Frozen);
    }

    if issuer == source || issuer == *destination {
        pay_direct(&source, destination, amount, view)
    } else {
        pay_rippling(&source, destination, amount, view)
    }
}

fn pay_direct(
    source: &AccountId,
    destination: &AccountId,
    amount: &IssuedAmount,
    view: &mut Sandbox<'_>,
) -> EngineResult<TxCode> {
    let mut line = check!(view
        .trust_line(source, destination, &amount.currency)?
        .ok_or(TxCode::NoTrustLine));
    if line.frozen_by(source) || line.frozen_by(destination) {
        return Ok(TxCode::Frozen);
    }
    let held = check!(line
        .balance_for(destination)
        .checked_add(&amount.value)
        .map_err(|_| TxCode::Overflow));
    if held.signum() > 0 && held > line.limit_of(destination) {
        return Ok(TxCode::LimitExceeded);
    }
    line.set_balance_for(destination, held);
    trace!(
        from = %source,
        to = %destination,
        value = %amount.value,
        currency = %amount.currency,
        "direct issued payment"
    );
    view.put_trust_line(line);
    Ok(TxCode::Success)
}

fn pay_rippling(
    source: &AccountId,
    destination: &AccountId,
    amount: &IssuedAmount,
    view: &mut Sandbox<'_>,
) -> EngineResult<TxCode> {
    let issuer = amount.issuer;
    let mut from = check!(view
        .trust_line(source, &issuer, &amount.currency)?
        .ok_or(TxCode::NoTrustLine));
    let mut to = check!(view
        .trust_line(destination, &issuer, &amount.currency)?
        .ok_or(TxCode::NoTrustLine));

    if from.frozen_by(&issuer) || to.frozen_by(&issuer) {
        return Ok(TxCode::Frozen);
    }
    if from.no_ripple(&issuer) && to.no_ripple(&issuer) {
        return Ok(TxCode::NoRipple);
    }

    let held = from.balance_for(source);
    if held < amount.value {
        return Ok(TxCode::InsufficientFunds);
    }
    let received = check!(to
        .balance_for(destination)
        .checked_add(&amount.value)
        .map_err(|_| TxCode::Overflow));
    if received > to.limit_of(destination) {
        return Ok(TxCode::LimitExceeded);
    }

    let remaining = check!(held.checked_sub(&amount.value).map_err(|_| TxCode::Overflow));
    from.set_balance_for(source, remaining);
    to.set_balance_for(destination, received);
    trace!(
        from = %source,
        to = %destination,
        through = %issuer,
        value = %amount.value,
        "rippling issued payment"
    );
    view.put_trust_line(from);
    view.put_trust_line(to);
    Ok(TxCode::Success)
}
