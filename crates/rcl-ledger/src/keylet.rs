//! Deterministic index keys of ledger entries.
//!
//! Every key is the INDEX-domain hash of a one-byte space tag followed by
//! the fields that identify the entry, so keys of different entry types
//! never collide.

use rcl_crypto::ContentHasher;
use rcl_types::{AccountId, Currency, Hash256};

const ACCOUNT_SPACE: &[u8] = b"a";
const TRUST_LINE_SPACE: &[u8] = b"r";
const OFFER_SPACE: &[u8] = b"o";
const SKIP_LIST_SPACE: &[u8] = b"s";

pub fn account(id: &AccountId) -> Hash256 {
    ContentHasher::INDEX.hash_parts(&[ACCOUNT_SPACE, id.as_bytes()])
}

/// The same key whichever side of the line is named first.
pub fn trust_line(a: &AccountId, b: &AccountId, currency: &Currency) -> Hash256 {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    ContentHasher::INDEX.hash_parts(&[
        TRUST_LINE_SPACE,
        low.as_bytes(),
        high.as_bytes(),
        currency.as_bytes(),
    ])
}

pub fn offer(owner: &AccountId, sequence: u32) -> Hash256 {
    ContentHasher::INDEX.hash_parts(&[OFFER_SPACE, owner.as_bytes(), &sequence.to_be_bytes()])
}

/// The skip list of the most recent 256 ancestors.
pub fn skip_list() -> Hash256 {
    ContentHasher::INDEX.hash_parts(&[SKIP_LIST_SPACE])
}

/// The skip list of every 256th ancestor in the 65536-ledger group holding
/// `ledger_seq`.
pub fn skip_list_group(ledger_seq: u32) -> Hash256 {
    let group = ledger_seq >> 16;
    ContentHasher::INDEX.hash_parts(&[SKIP_LIST_SPACE, &group.to_be_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_line_key_is_symmetric() {
        let a = AccountId::from_public_key(b"a");
        let b = AccountId::from_public_key(b"b");
        let foo = Currency::from_code("FOO").unwrap();
        let bar = Currency::from_code("BAR").unwrap();
        assert_eq!(trust_line(&a, &b, &foo), trust_line(&b, &a, &foo));
        assert_ne!(trust_line(&a, &b, &foo), trust_line(&a, &b, &bar));
    }

    #[test]
    fn spaces_do_not_collide() {
        let a = AccountId::from_public_key(b"a");
        assert_ne!(account(&a), offer(&a, 0));
        assert_ne!(offer(&a, 1), offer(&a, 2));
        assert_ne!(skip_list(), skip_list_group(0));
    }

    #[test]
    fn group_key_changes_every_65536_ledgers() {
        assert_eq!(skip_list_group(256), skip_list_group(65_535));
        assert_ne!(skip_list_group(65_535), skip_list_group(65_536));
    }
}
