//! Error types for bindery-config.

use bindery_common::GenError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration or argument file.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A wildcard pattern could not be compiled.
    #[error("invalid wildcard `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    /// Configuration validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for GenError {
    fn from(err: ConfigError) -> Self {
        GenError::Config(err.to_string())
    }
}
