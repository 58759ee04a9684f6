//! Cryptographic primitives for the replicated closing ledger.
//!
//! Provides domain-separated BLAKE3 hashing for tree nodes, ledger headers
//! and transaction ids, plus deterministic keypair derivation and signing
//! over two schemes (secp256k1 and ed25519).
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod keypair;
pub mod request;

pub use hasher::{sha512_half, ContentHasher, HasherError};
pub use keypair::{
    verify, Ed25519Scheme, KeyError, KeyPair, PublicKey, Secp256k1Scheme, SecretKey, Seed,
    SignatureAlgorithm, SignatureScheme,
};
pub use request::KeypairRequest;
