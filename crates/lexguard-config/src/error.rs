//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to render config as TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to merge configuration: {0}")]
    MergeError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid IP range '{value}': {reason}")]
    InvalidIpRange { value: String, reason: String },

    #[error("XDG directory error: {0}")]
    XdgError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::MergeError(e.to_string())
    }
}
