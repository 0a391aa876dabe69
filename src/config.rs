//! Engine configuration
//!
//! Parsed from TOML by the binary. Every section has defaults, so an empty
//! document is a valid configuration. This module performs no file I/O.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::{BindingConfig, DispatcherSettings};
use crate::producer::GamepadSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gamepad: GamepadSettings,
    pub dispatcher: DispatcherSettings,
    pub bindings: Vec<BindingConfig>,
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(input)?;
        config.validate()?;
        debug!("Loaded configuration with {} bindings", config.bindings.len());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the engine sections. Bindings are validated one by one when
    /// they are registered, so a single bad binding does not reject the file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gamepad
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[gamepad] {}", e)))?;
        self.dispatcher
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[dispatcher] {}", e)))?;
        Ok(())
    }
}
