//! Error types for lti-nn

use thiserror::Error;

/// Result type for lti-nn operations
pub type Result<T> = std::result::Result<T, LtiError>;

/// lti-nn error types
#[derive(Error, Debug)]
pub enum LtiError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<toml::de::Error> for LtiError {
    fn from(err: toml::de::Error) -> Self {
        LtiError::ConfigError(err.to_string())
    }
}
