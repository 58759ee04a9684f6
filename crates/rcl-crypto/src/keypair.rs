use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rcl_types::AccountId;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::hasher::sha512_half;

/// Base58 version byte of an encoded seed (`s...`).
const SEED_VERSION: u8 = 33;

/// Tag byte prefixed to every Ed25519 key encoding.
const ED25519_TAG: u8 = 0xED;

/// Tag byte prefixed to secp256k1 secret key encodings.
const SECP256K1_SECRET_TAG: u8 = 0x00;

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// 128 bits of key material from which every keypair of an account family
/// is derived.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 16]);

impl Seed {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; 16] = bytes.try_into().map_err(|_| {
            KeyError::InvalidSeed(format!("expected 16 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(raw))
    }

    /// First 16 bytes of SHA-512-half of the passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, KeyError> {
        if passphrase.is_empty() {
            return Err(KeyError::InvalidSeed("empty passphrase".into()));
        }
        let digest = Zeroizing::new(sha512_half(&[passphrase.as_bytes()]));
        Self::from_slice(&digest[..16])
    }

    /// Exactly 32 hex characters.
    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        if text.len() != 32 {
            return Err(KeyError::InvalidSeed(format!(
                "expected 32 hex characters, got {}",
                text.len()
            )));
        }
        let bytes =
            Zeroizing::new(hex::decode(text).map_err(|e| KeyError::InvalidSeed(e.to_string()))?);
        Self::from_slice(&bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes)
    }

    /// Base58check encoding (`s...`).
    pub fn from_base58(text: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(
            bs58::decode(text)
                .with_alphabet(bs58::Alphabet::RIPPLE)
                .with_check(Some(SEED_VERSION))
                .into_vec()
                .map_err(|e| KeyError::InvalidSeed(e.to_string()))?,
        );
        match decoded.len() {
            17 => Self::from_slice(&decoded[1..]),
            _ => Self::from_slice(&decoded),
        }
    }

    /// Interpret free-form secret text: an encoded seed, 32 hex characters,
    /// or else a passphrase.
    pub fn parse_generic(text: &str) -> Result<Self, KeyError> {
        if text.is_empty() {
            return Err(KeyError::InvalidSeed("empty secret".into()));
        }
        if let Ok(seed) = Self::from_base58(text) {
            return Ok(seed);
        }
        if let Ok(seed) = Self::from_hex(text) {
            return Ok(seed);
        }
        Self::from_passphrase(text)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check_version(SEED_VERSION)
            .into_string()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Algorithms
// ---------------------------------------------------------------------------

/// The closed set of supported signature algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Secp256k1,
    Ed25519,
}

impl SignatureAlgorithm {
    /// The scheme implementing this algorithm.
    pub fn scheme(&self) -> &'static dyn SignatureScheme {
        match self {
            Self::Secp256k1 => &Secp256k1Scheme,
            Self::Ed25519 => &Ed25519Scheme,
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secp256k1" => Ok(Self::Secp256k1),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(KeyError::InvalidAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => write!(f, "secp256k1"),
            Self::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// Capability shared by every signature algorithm.
pub trait SignatureScheme: Send + Sync {
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Derive the keypair at `index` of the family rooted at `seed`.
    fn derive(&self, seed: &Seed, index: u32) -> Result<KeyPair, KeyError>;

    fn sign(&self, secret: &SecretKey, message: &[u8]) -> Result<Vec<u8>, KeyError>;

    fn verify(&self, public: &PublicKey, message: &[u8], signature: &[u8]) -> bool;
}

// ---------------------------------------------------------------------------
// secp256k1
// ---------------------------------------------------------------------------

/// Deterministic secp256k1 families: one root key per seed, many account
/// keys per root.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Scheme;

impl Secp256k1Scheme {
    /// First valid scalar of `SHA-512-half(seed ‖ counter)`.
    fn root_key(seed: &Seed) -> Result<libsecp256k1::SecretKey, KeyError> {
        for counter in 0u32..=u32::MAX {
            let candidate = Zeroizing::new(sha512_half(&[seed.as_bytes(), &counter.to_be_bytes()]));
            if let Ok(key) = libsecp256k1::SecretKey::parse(&candidate) {
                return Ok(key);
            }
        }
        Err(KeyError::DerivationFailed)
    }

    /// First valid scalar of `SHA-512-half(generator ‖ index ‖ subcounter)`.
    fn account_tweak(generator: &[u8; 33], index: u32) -> Result<libsecp256k1::SecretKey, KeyError> {
        for sub in 0u32..=u32::MAX {
            let candidate = Zeroizing::new(sha512_half(&[
                generator,
                &index.to_be_bytes(),
                &sub.to_be_bytes(),
            ]));
            if let Ok(key) = libsecp256k1::SecretKey::parse(&candidate) {
                return Ok(key);
            }
        }
        Err(KeyError::DerivationFailed)
    }

    fn secret_scalar(secret: &SecretKey) -> Result<libsecp256k1::SecretKey, KeyError> {
        let bytes = secret.as_bytes();
        if bytes[0] != SECP256K1_SECRET_TAG {
            return Err(KeyError::InvalidKey);
        }
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&bytes[1..]);
        libsecp256k1::SecretKey::parse(&scalar).map_err(|_| KeyError::InvalidKey)
    }
}

impl SignatureScheme for Secp256k1Scheme {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Secp256k1
    }

    fn derive(&self, seed: &Seed, index: u32) -> Result<KeyPair, KeyError> {
        let root = Self::root_key(seed)?;
        let generator = libsecp256k1::PublicKey::from_secret_key(&root);
        let tweak = Self::account_tweak(&generator.serialize_compressed(), index)?;

        let mut account_public = generator;
        account_public
            .tweak_add_assign(&tweak)
            .map_err(|_| KeyError::DerivationFailed)?;
        let mut account_secret = root;
        account_secret
            .tweak_add_assign(&tweak)
            .map_err(|_| KeyError::DerivationFailed)?;

        let mut secret = [0u8; 33];
        secret[0] = SECP256K1_SECRET_TAG;
        secret[1..].copy_from_slice(&Zeroizing::new(account_secret.serialize())[..]);

        Ok(KeyPair {
            algorithm: SignatureAlgorithm::Secp256k1,
            public: PublicKey(account_public.serialize_compressed().to_vec()),
            secret: SecretKey(secret),
        })
    }

    fn sign(&self, secret: &SecretKey, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let scalar = Self::secret_scalar(secret)?;
        let digest = libsecp256k1::Message::parse(&sha512_half(&[message]));
        let (signature, _) = libsecp256k1::sign(&digest, &scalar);
        Ok(signature.serialize().to_vec())
    }

    fn verify(&self, public: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 33]>::try_from(public.as_bytes()) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(key) = libsecp256k1::PublicKey::parse_compressed(&key_bytes) else {
            return false;
        };
        let Ok(sig) = libsecp256k1::Signature::parse_standard(&sig_bytes) else {
            return false;
        };
        // Only the low-S form is accepted, so a signature has one encoding.
        if sig.s.is_high() {
            return false;
        }
        let digest = libsecp256k1::Message::parse(&sha512_half(&[message]));
        libsecp256k1::verify(&digest, &sig, &key)
    }
}

// ---------------------------------------------------------------------------
// ed25519
// ---------------------------------------------------------------------------

/// Ed25519 keys: one keypair per seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl Ed25519Scheme {
    fn signing_key(secret: &SecretKey) -> Result<ed25519_dalek::SigningKey, KeyError> {
        let bytes = secret.as_bytes();
        if bytes[0] != ED25519_TAG {
            return Err(KeyError::InvalidKey);
        }
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&bytes[1..]);
        Ok(ed25519_dalek::SigningKey::from_bytes(&scalar))
    }
}

impl SignatureScheme for Ed25519Scheme {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn derive(&self, seed: &Seed, index: u32) -> Result<KeyPair, KeyError> {
        if index != 0 {
            return Err(KeyError::UnsupportedIndex {
                algorithm: SignatureAlgorithm::Ed25519,
                index,
            });
        }
        let scalar = Zeroizing::new(sha512_half(&[seed.as_bytes()]));
        let signing = ed25519_dalek::SigningKey::from_bytes(&scalar);

        let mut public = Vec::with_capacity(33);
        public.push(ED25519_TAG);
        public.extend_from_slice(signing.verifying_key().as_bytes());

        let mut secret = [0u8; 33];
        secret[0] = ED25519_TAG;
        secret[1..].copy_from_slice(&scalar[..]);

        Ok(KeyPair {
            algorithm: SignatureAlgorithm::Ed25519,
            public: PublicKey(public),
            secret: SecretKey(secret),
        })
    }

    fn sign(&self, secret: &SecretKey, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        use ed25519_dalek::Signer;
        let signing = Self::signing_key(secret)?;
        Ok(signing.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, public: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        let bytes = public.as_bytes();
        if bytes.len() != 33 || bytes[0] != ED25519_TAG {
            return false;
        }
        let Ok(key_bytes) = <[u8; 32]>::try_from(&bytes[1..]) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        key.verify_strict(message, &sig).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A 33-byte public key: `0xED ‖ key` for Ed25519, compressed SEC1 for
/// secp256k1.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Validate the tag byte and length of an encoded key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let key = Self(bytes.to_vec());
        if bytes.len() != 33 || key.algorithm().is_none() {
            return Err(KeyError::InvalidKey);
        }
        Ok(key)
    }

    /// The algorithm indicated by the tag byte.
    pub fn algorithm(&self) -> Option<SignatureAlgorithm> {
        match self.0.first() {
            Some(&ED25519_TAG) => Some(SignatureAlgorithm::Ed25519),
            Some(0x02) | Some(0x03) => Some(SignatureAlgorithm::Secp256k1),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The account controlled by this key.
    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// A 33-byte tagged secret key. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; 33]);

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

/// A derived keypair, tagged with its algorithm.
#[derive(Clone)]
pub struct KeyPair {
    algorithm: SignatureAlgorithm,
    public: PublicKey,
    secret: SecretKey,
}

impl KeyPair {
    /// The first keypair of the family rooted at `seed`.
    pub fn derive(seed: &Seed, algorithm: SignatureAlgorithm) -> Result<Self, KeyError> {
        Self::derive_with_index(seed, algorithm, 0)
    }

    pub fn derive_with_index(
        seed: &Seed,
        algorithm: SignatureAlgorithm,
        index: u32,
    ) -> Result<Self, KeyError> {
        algorithm.scheme().derive(seed, index)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn account_id(&self) -> AccountId {
        self.public.account_id()
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.algorithm.scheme().sign(&self.secret, message)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Verify a signature with whichever scheme the key's tag byte names.
pub fn verify(public: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    match public.algorithm() {
        Some(algorithm) => algorithm.scheme().verify(public, message, signature),
        None => false,
    }
}

/// Errors from key derivation and signing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("{algorithm} does not support account index {index}")]
    UnsupportedIndex {
        algorithm: SignatureAlgorithm,
        index: u32,
    },

    #[error("missing secret: one of passphrase, secret, seed or seed_hex is required")]
    MissingSecret,

    #[error("bad secret: {0}")]
    BadSecret(String),

    #[error("invalid key")]
    InvalidKey,

    #[error("key derivation failed")]
    DerivationFailed,
}
