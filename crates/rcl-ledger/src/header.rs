use rcl_crypto::ContentHasher;
use rcl_types::{Drops, Hash256};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// The hashed summary of a ledger.
///
/// Times are seconds since 2000-01-01T00:00:00Z.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub sequence: u32,
    pub parent_hash: Hash256,
    pub total_drops: Drops,
    pub account_hash: Hash256,
    pub tx_hash: Hash256,
    pub close_time: u64,
    pub parent_close_time: u64,
    pub close_time_resolution: u32,
    pub close_time_correct: bool,
}

impl LedgerHeader {
    /// LEDGER-domain hash of the canonical encoding.
    pub fn hash(&self) -> LedgerResult<Hash256> {
        ContentHasher::LEDGER
            .hash_bincode(self)
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> LedgerResult<Self> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_affects_the_hash() {
        let base = LedgerHeader {
            sequence: 3,
            total_drops: Drops::new(100),
            close_time_resolution: 30,
            ..Default::default()
        };
        let h = base.hash().unwrap();
        let variants = [
            LedgerHeader { sequence: 4, ..base.clone() },
            LedgerHeader { parent_hash: Hash256::digest(b"p"), ..base.clone() },
            LedgerHeader { total_drops: Drops::new(99), ..base.clone() },
            LedgerHeader { account_hash: Hash256::digest(b"a"), ..base.clone() },
            LedgerHeader { tx_hash: Hash256::digest(b"t"), ..base.clone() },
            LedgerHeader { close_time: 1, ..base.clone() },
            LedgerHeader { parent_close_time: 1, ..base.clone() },
            LedgerHeader { close_time_resolution: 10, ..base.clone() },
            LedgerHeader { close_time_correct: true, ..base.clone() },
        ];
        for variant in variants {
            assert_ne!(variant.hash().unwrap(), h, "{variant:?}");
        }
    }

    #[test]
    fn encoding_roundtrip() {
        let header = LedgerHeader {
            sequence: 9,
            close_time: 12345,
            ..Default::default()
        };
        assert_eq!(LedgerHeader::decode(&header.encode().unwrap()).unwrap(), header);
    }
}
