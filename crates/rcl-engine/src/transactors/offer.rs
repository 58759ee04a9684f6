use rcl_ledger::{keylet, AccountRoot, LedgerEntry, Offer};
use rcl_types::{book_base, Amount, Quality};
use tracing::trace;

use crate::error::EngineResult;
use crate::result::TxCode;
use crate::sandbox::Sandbox;
use crate::transaction::Transaction;
use crate::transactor::{check, positive_amount, Transactor};

/// Place an offer in its book. Offers never cross here.
pub struct OfferCreateTransactor;

impl Transactor for OfferCreateTransactor {
    fn name(&self) -> &'static str {
        "offer-create"
    }

    fn preflight(&self, tx: &Transaction) -> Result<(), TxCode> {
        let pays = positive_amount(tx.taker_pays.as_ref())?;
        let gets = positive_amount(tx.taker_gets.as_ref())?;
        if pays.is_native() && gets.is_native() {
            return Err(TxCode::BadAmount);
        }
        if pays.asset() == gets.asset() {
            return Err(TxCode::Redundant);
        }
        if tx.flags != 0 {
            return Err(TxCode::InvalidFlags);
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, view: &mut Sandbox<'_>) -> EngineResult<TxCode> {
        let (Some(taker_pays), Some(taker_gets)) = (tx.taker_pays, tx.taker_gets) else {
            return Ok(TxCode::MissingField);
        };
        let mut owner = check!(view.account(&tx.account)?.ok_or(TxCode::NoAccount));

        for amount in [&taker_pays, &taker_gets] {
            if let Amount::Issued(issued) = amount {
                let issuer = check!(view.account(&issued.issuer)?.ok_or(TxCode::NoIssuer));
                if issuer.is_globally_frozen() {
                    return Ok(TxCode::Frozen);
                }
            }
        }
        check!(funded(tx, &owner, &taker_gets, view)?);

        let quality = check!(
            Quality::from_amounts(&taker_gets, &taker_pays).map_err(|_| TxCode::BadAmount)
        );
        let book_directory = quality.book_index(&book_base(&taker_pays.asset(), &taker_gets.asset()));
        let offer = Offer {
            account: tx.account,
            sequence: tx.sequence,
            taker_pays,
            taker_gets,
            book_directory,
            quality,
        };
        trace!(
            owner = %tx.account,
            sequence = tx.sequence,
            quality = quality.value(),
            book = %book_directory.short_hex(),
            "placed offer"
        );
        view.put(keylet::offer(&tx.account, tx.sequence), LedgerEntry::Offer(offer));
        owner.owner_count += 1;
        view.put_account(owner);
        Ok(TxCode::Success)
    }
}

/// Whether the owner can deliver any of `taker_gets`.
fn funded(
    tx: &Transaction,
    owner: &AccountRoot,
    taker_gets: &Amount,
    view: &Sandbox<'_>,
) -> EngineResult<Result<(), TxCode>> {
    match taker_gets {
        Amount::Native(_) => {
            if owner.balance > tx.fee {
                Ok(Ok(()))
            } else {
                Ok(Err(TxCode::UnfundedOffer))
            }
        }
        Amount::Issued(issued) if issued.issuer == tx.account => Ok(Ok(())),
        Amount::Issued(issued) => {
            let Some(line) = view.trust_line(&tx.account, &issued.issuer, &issued.currency)? else {
                return Ok(Err(TxCode::UnfundedOffer));
            };
            if line.frozen_by(&issued.issuer) {
                return Ok(Err(TxCode::Frozen));
            }
            if line.balance_for(&tx.account).signum() <= 0 {
                return Ok(Err(TxCode::UnfundedOffer));
            }
            Ok(Ok(()))
        }
    }
}

/// Remove one of the sender's offers.
pub struct OfferCancelTransactor;

impl Transactor for OfferCancelTransactor {
    fn name(&self) -> &'static str {
        "offer-cancel"
    }

    fn preflight(&self, tx: &Transaction) -> Result<(), TxCode> {
        let offer_sequence = tx.offer_sequence.ok_or(TxCode::MissingField)?;
        if offer_sequence == 0 || offer_sequence >= tx.sequence {
            return Err(TxCode::BadSequence);
        }
        if tx.flags != 0 {
            return Err(TxCode::InvalidFlags);
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, view: &mut Sandbox<'_>) -> EngineResult<TxCode> {
        let Some(offer_sequence) = tx.offer_sequence else {
            return Ok(TxCode::MissingField);
        };
        let mut owner = check!(view.account(&tx.account)?.ok_or(TxCode::NoAccount));
        check!(view
            .offer(&tx.account, offer_sequence)?
            .ok_or(TxCode::NoSuchOffer));

        view.erase(keylet::offer(&tx.account, offer_sequence));
        owner.owner_count = owner.owner_count.saturating_sub(1);
        view.put_account(owner);
        trace!(owner = %tx.account, offer_sequence, "cancelled offer");
        Ok(TxCode::Success)
    }
}
