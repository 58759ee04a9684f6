use rcl_ledger::AccountRoot;
use tracing::trace;

use crate::error::EngineResult;
use crate::result::TxCode;
use crate::sandbox::Sandbox;
use crate::transaction::{Transaction, ASF_DEFAULT_RIPPLE, ASF_GLOBAL_FREEZE, ASF_NO_FREEZE};
use crate::transactor::{check, Transactor};

/// The account-root flag an AccountSet flag number controls.
fn account_flag(asf: u32) -> Option<u32> {
    match asf {
        ASF_NO_FREEZE => Some(AccountRoot::NO_FREEZE),
        ASF_GLOBAL_FREEZE => Some(AccountRoot::GLOBAL_FREEZE),
        ASF_DEFAULT_RIPPLE => Some(AccountRoot::DEFAULT_RIPPLE),
        _ => None,
    }
}

/// Set or clear account-wide flags.
///
/// No-freeze cannot be undone: clearing it is a no-op. Once it is set,
/// global freeze can no longer be lifted.
pub struct AccountSetTransactor;

impl Transactor for AccountSetTransactor {
    fn name(&self) -> &'static str {
        "account-set"
    }

    fn preflight(&self, tx: &Transaction) -> Result<(), TxCode> {
        if tx.flags != 0 {
            return Err(TxCode::InvalidFlags);
        }
        for flag in [tx.set_flag, tx.clear_flag].into_iter().flatten() {
            if account_flag(flag).is_none() {
                return Err(TxCode::InvalidFlags);
            }
        }
        if tx.set_flag.is_some() && tx.set_flag == tx.clear_flag {
            return Err(TxCode::InvalidFlags);
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, view: &mut Sandbox<'_>) -> EngineResult<TxCode> {
        let mut root = check!(view.account(&tx.account)?.ok_or(TxCode::NoAccount));

        if let Some(flag) = tx.set_flag.and_then(account_flag) {
            root.set_flag(flag);
        }
        match tx.clear_flag {
            Some(ASF_NO_FREEZE) | None => {}
            Some(ASF_GLOBAL_FREEZE) if root.has_flag(AccountRoot::NO_FREEZE) => {
                return Ok(TxCode::NoPermission);
            }
            Some(other) => {
                if let Some(flag) = account_flag(other) {
                    root.clear_flag(flag);
                }
            }
        }

        trace!(account = %tx.account, flags = root.flags, "updated account flags");
        view.put_account(root);
        Ok(TxCode::Success)
    }
}
