use std::path::Path;

use serde::{Deserialize, Serialize};

/// Ledger-level settings shared by every participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Close times are rounded to this many seconds.
    pub close_time_resolution: u32,
    /// Native drops created in the genesis ledger.
    pub genesis_drops: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            close_time_resolution: 30,
            genesis_drops: 100_000_000_000 * 1_000_000,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.close_time_resolution == 0 {
            return Err(ConfigError::Invalid(
                "close_time_resolution must be positive".into(),
            ));
        }
        if self.genesis_drops == 0 {
            return Err(ConfigError::Invalid("genesis_drops must be positive".into()));
        }
        Ok(())
    }
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
