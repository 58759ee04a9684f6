use rcl_ledger::{AccountRoot, TrustLine};
use rcl_types::Amount;
use tracing::trace;

use crate::error::EngineResult;
use crate::result::TxCode;
use crate::sandbox::Sandbox;
use crate::transaction::{
    Transaction, TF_CLEAR_FREEZE, TF_CLEAR_NO_RIPPLE, TF_SET_FREEZE, TF_SET_NO_RIPPLE,
};
use crate::transactor::{check, Transactor};

const VALID_FLAGS: u32 = TF_SET_NO_RIPPLE | TF_CLEAR_NO_RIPPLE | TF_SET_FREEZE | TF_CLEAR_FREEZE;

/// Create, update or delete the sender's side of a trust line.
///
/// The line's limit for the sender is taken from `limit_amount`, whose
/// issuer names the peer. A line left with no balance, no limits and no
/// freeze is deleted and stops counting against its owner.
pub struct TrustSetTransactor;

impl Transactor for TrustSetTransactor {
    fn name(&self) -> &'static str {
        "trust-set"
    }

    fn preflight(&self, tx: &Transaction) -> Result<(), TxCode> {
        let limit = match tx.limit_amount.ok_or(TxCode::MissingField)? {
            Amount::Issued(limit) => limit,
            Amount::Native(_) => return Err(TxCode::BadAmount),
        };
        if limit.value.is_negative() {
            return Err(TxCode::BadAmount);
        }
        if limit.issuer == tx.account {
            return Err(TxCode::Redundant);
        }
        if tx.flags & !VALID_FLAGS != 0 {
            return Err(TxCode::InvalidFlags);
        }
        if tx.has_flag(TF_SET_NO_RIPPLE) && tx.has_flag(TF_CLEAR_NO_RIPPLE) {
            return Err(TxCode::InvalidFlags);
        }
        if tx.has_flag(TF_SET_FREEZE) && tx.has_flag(TF_CLEAR_FREEZE) {
            return Err(TxCode::InvalidFlags);
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, view: &mut Sandbox<'_>) -> EngineResult<TxCode> {
        let Some(Amount::Issued(limit)) = tx.limit_amount else {
            return Ok(TxCode::MissingField);
        };
        let account = tx.account;
        let peer = limit.issuer;

        let peer_root = check!(view.account(&peer)?.ok_or(TxCode::NoIssuer));
        let mut account_root = check!(view.account(&account)?.ok_or(TxCode::NoAccount));
        if tx.has_flag(TF_SET_FREEZE) && account_root.has_flag(AccountRoot::NO_FREEZE) {
            return Ok(TxCode::NoPermission);
        }

        let existing = view.trust_line(&account, &peer, &limit.currency)?;
        let created = existing.is_none();
        let mut line = existing.unwrap_or_else(|| {
            let mut line = TrustLine::new(account, peer, limit.currency);
            line.set_no_ripple(&peer, !peer_root.has_flag(AccountRoot::DEFAULT_RIPPLE));
            line
        });

        line.set_limit(&account, limit.value);
        if tx.has_flag(TF_SET_NO_RIPPLE) {
            line.set_no_ripple(&account, true);
        } else if tx.has_flag(TF_CLEAR_NO_RIPPLE) {
            line.set_no_ripple(&account, false);
        }
        if tx.has_flag(TF_SET_FREEZE) {
            line.set_freeze(&account, true);
        } else if tx.has_flag(TF_CLEAR_FREEZE) {
            line.set_freeze(&account, false);
        }

        if line.is_default() {
            if created {
                return Ok(TxCode::RedundantLine);
            }
            view.erase_trust_line(&line);
            if line.owner == account {
                account_root.owner_count = account_root.owner_count.saturating_sub(1);
            } else if let Some(mut owner) = view.account(&line.owner)? {
                owner.owner_count = owner.owner_count.saturating_sub(1);
                view.put_account(owner);
            }
            trace!(%account, %peer, currency = %limit.currency, "deleted trust line");
        } else {
            if created {
                account_root.owner_count += 1;
                trace!(%account, %peer, currency = %limit.currency, "created trust line");
            }
            view.put_trust_line(line);
        }
        view.put_account(account_root);
        Ok(TxCode::Success)
    }
}
