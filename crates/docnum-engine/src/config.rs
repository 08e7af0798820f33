//! # Engine Configuration
//!
//! One process-wide value: the unit whose counters all EXTERNAL documents
//! draw from. There is deliberately no fallback — if the configured unit
//! does not exist in the directory, EXTERNAL issuance fails with a
//! not-found error at issue time.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use docnum_core::UnitId;

/// Environment variable naming the EXTERNAL issuing-authority unit.
pub const EXTERNAL_ISSUER_ENV: &str = "DOCNUM_EXTERNAL_ISSUER_UNIT";

/// Error loading the engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    /// A value could not be parsed as a unit identifier.
    #[error("invalid unit id in {var}: {value:?}")]
    InvalidUnitId {
        /// The variable that held the value.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Static configuration consumed by the allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The fixed central authority whose sequences EXTERNAL documents use.
    pub external_issuer_unit: UnitId,
}

impl EngineConfig {
    /// Build a configuration directly.
    pub fn new(external_issuer_unit: UnitId) -> Self {
        Self {
            external_issuer_unit,
        }
    }

    /// Load the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = std::env::var(EXTERNAL_ISSUER_ENV)
            .map_err(|_| ConfigError::MissingVar(EXTERNAL_ISSUER_ENV))?;
        let uuid: Uuid = value.parse().map_err(|_| ConfigError::InvalidUnitId {
            var: EXTERNAL_ISSUER_ENV,
            value,
        })?;
        Ok(Self::new(UnitId(uuid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test drives all three from_env phases sequentially: the variable
    // is process-global state, so parallel test fns would race on it.
    #[test]
    fn test_from_env_phases() {
        std::env::remove_var(EXTERNAL_ISSUER_ENV);
        assert!(matches!(
            EngineConfig::from_env(),
            Err(ConfigError::MissingVar(_))
        ));

        std::env::set_var(EXTERNAL_ISSUER_ENV, "not-a-uuid");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(ConfigError::InvalidUnitId { .. })
        ));

        let unit = UnitId::new();
        std::env::set_var(EXTERNAL_ISSUER_ENV, unit.as_uuid().to_string());
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.external_issuer_unit, unit);

        std::env::remove_var(EXTERNAL_ISSUER_ENV);
    }
}
