use serde::{Deserialize, Serialize};

use crate::keypair::{KeyError, KeyPair, Seed, SignatureAlgorithm};

/// A keypair request naming exactly one secret input.
///
/// `passphrase`, `seed` (base58), `seed_hex` and the legacy free-form
/// `secret` are mutually exclusive. The legacy form predates algorithm
/// selection and always means secp256k1.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct KeypairRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_hex: Option<String>,
}

impl KeypairRequest {
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(passphrase.into()),
            ..Self::default()
        }
    }

    pub fn algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm = Some(name.into());
        self
    }

    /// Resolve the request into a seed and algorithm.
    pub fn resolve_seed(&self) -> Result<(Seed, SignatureAlgorithm), KeyError> {
        let given = [
            self.passphrase.is_some(),
            self.secret.is_some(),
            self.seed.is_some(),
            self.seed_hex.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();

        match given {
            0 => return Err(KeyError::MissingSecret),
            1 => {}
            _ => {
                return Err(KeyError::BadSecret(
                    "passphrase, secret, seed and seed_hex are mutually exclusive".into(),
                ))
            }
        }

        if let Some(secret) = &self.secret {
            if self.algorithm.is_some() {
                return Err(KeyError::BadSecret(
                    "secret cannot be combined with algorithm".into(),
                ));
            }
            return Ok((Seed::parse_generic(secret)?, SignatureAlgorithm::Secp256k1));
        }

        let algorithm = match &self.algorithm {
            Some(name) => name.parse()?,
            None => SignatureAlgorithm::default(),
        };

        let seed = if let Some(passphrase) = &self.passphrase {
            Seed::from_passphrase(passphrase)?
        } else if let Some(encoded) = &self.seed {
            Seed::from_base58(encoded)?
        } else if let Some(hex) = &self.seed_hex {
            Seed::from_hex(hex)?
        } else {
            return Err(KeyError::MissingSecret);
        };
        Ok((seed, algorithm))
    }

    /// Resolve the request and derive the account keypair.
    pub fn resolve(&self) -> Result<KeyPair, KeyError> {
        let (seed, algorithm) = self.resolve_seed()?;
        KeyPair::derive(&seed, algorithm)
    }
}

impl std::fmt::Debug for KeypairRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |field: &Option<String>| field.as_ref().map(|_| "<redacted>");
        f.debug_struct("KeypairRequest")
            .field("algorithm", &self.algorithm)
            .field("passphrase", &redact(&self.passphrase))
            .field("secret", &redact(&self.secret))
            .field("seed", &redact(&self.seed))
            .field("seed_hex", &redact(&self.seed_hex))
            .finish()
    }
}
