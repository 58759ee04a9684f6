use std::path::Path;

use rcl_ledger::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings of the transaction engine and the close loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smallest fee, in drops, a transaction may declare.
    pub base_fee: u64,
    /// Upper bound on retry passes per close. The number of pending
    /// transactions always bounds it as well.
    pub max_passes: Option<usize>,
    /// Allow [`ValidationMode::SkipSignatures`](crate::ValidationMode) to
    /// take effect. Only settable from code.
    #[serde(skip)]
    pub signature_bypass: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_fee: 10,
            max_passes: None,
            signature_bypass: false,
        }
    }
}

impl EngineConfig {
    /// A configuration whose engine honours requests to skip signature
    /// checks. For test harnesses.
    pub fn with_signature_bypass() -> Self {
        Self {
            signature_bypass: true,
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == Some(0) {
            return Err(ConfigError::Invalid("max_passes must be positive".into()));
        }
        Ok(())
    }
}
