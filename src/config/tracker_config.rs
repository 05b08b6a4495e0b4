//! Tracker settings read from the environment.
//!
//! - REQUIRED_CONFIRMATIONS: confirmations before a purchase is final (default 12)
//! - NETWORK_ID: chain id recorded on synthesized snapshots (default 1)

use std::env;

use thiserror::Error;

use crate::constants::{DEFAULT_NETWORK_ID, DEFAULT_REQUIRED_CONFIRMATIONS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("Missing required value: {0}")]
    MissingValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub required_confirmations: u64,
    pub network_id: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            network_id: DEFAULT_NETWORK_ID,
        }
    }
}

impl TrackerConfig {
    /// Loads `.env` if present, then reads the tracker variables. Unset
    /// variables take their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            required_confirmations: read_u64(
                "REQUIRED_CONFIRMATIONS",
                DEFAULT_REQUIRED_CONFIRMATIONS,
            )?,
            network_id: read_u64("NETWORK_ID", DEFAULT_NETWORK_ID)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                name: "REQUIRED_CONFIRMATIONS".to_string(),
                value: self.required_confirmations.to_string(),
            });
        }
        Ok(())
    }
}

fn read_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::MissingValue(name.to_string())),
    }
}
