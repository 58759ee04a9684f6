use rcl_types::Hash256;
use sha2::{Digest, Sha512};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"rcl-inner-v1"`) that is prepended
/// to every hash computation. An inner tree node and a leaf with identical
/// bytes therefore never share a hash, and neither collides with a ledger
/// header or a transaction id.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Leaves of the account-state tree.
    pub const ACCOUNT_LEAF: Self = Self {
        domain: "rcl-account-leaf-v1",
    };
    /// Leaves of the transaction tree.
    pub const TX_LEAF: Self = Self {
        domain: "rcl-tx-leaf-v1",
    };
    /// Inner nodes of either tree.
    pub const INNER: Self = Self {
        domain: "rcl-inner-v1",
    };
    /// Closed ledger headers.
    pub const LEDGER: Self = Self {
        domain: "rcl-ledger-v1",
    };
    /// Transaction identity.
    pub const TX_ID: Self = Self {
        domain: "rcl-txid-v1",
    };
    /// Ledger entry index keys.
    pub const INDEX: Self = Self {
        domain: "rcl-index-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Hash256 {
        self.hash_parts(&[data])
    }

    /// Hash the concatenation of several byte slices with domain separation.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> Hash256 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(part);
        }
        Hash256::from_array(*hasher.finalize().as_bytes())
    }

    /// Hash the canonical bincode encoding of a value.
    pub fn hash_bincode<T: serde::Serialize>(&self, value: &T) -> Result<Hash256, HasherError> {
        let data =
            bincode::serialize(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &Hash256) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// First half of a SHA-512 digest over the concatenated parts.
///
/// This is the key-derivation function of both signature schemes.
pub fn sha512_half(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut half = [0u8; 32];
    half.copy_from_slice(&digest[..32]);
    half
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = ContentHasher::INNER.hash(b"node");
        let b = ContentHasher::INNER.hash(b"node");
        assert_eq!(a, b);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let account = ContentHasher::ACCOUNT_LEAF.hash(data);
        let tx = ContentHasher::TX_LEAF.hash(data);
        let inner = ContentHasher::INNER.hash(data);
        assert_ne!(account, tx);
        assert_ne!(account, inner);
        assert_ne!(tx, inner);
    }

    #[test]
    fn parts_hash_like_their_concatenation() {
        let joined = ContentHasher::LEDGER.hash(b"headerbody");
        let parts = ContentHasher::LEDGER.hash_parts(&[b"header", b"body"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::TX_ID.hash(b"original");
        assert!(ContentHasher::TX_ID.verify(b"original", &id));
        assert!(!ContentHasher::TX_ID.verify(b"tampered", &id));
    }

    #[test]
    fn bincode_hash_matches_manual_encoding() {
        let value = (7u32, String::from("seven"));
        let manual = ContentHasher::INDEX.hash(&bincode::serialize(&value).unwrap());
        assert_eq!(ContentHasher::INDEX.hash_bincode(&value).unwrap(), manual);
    }

    #[test]
    fn sha512_half_known_answer() {
        // SHA-512("abc"), first 32 bytes.
        let expected =
            hex::decode("ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a")
                .unwrap();
        assert_eq!(sha512_half(&[b"abc"]).to_vec(), expected);
        assert_eq!(sha512_half(&[b"a", b"bc"]), sha512_half(&[b"abc"]));
    }
}
