//! Error types for lti-data

use std::path::PathBuf;

use thiserror::Error;

/// Result type for lti-data operations
pub type Result<T> = std::result::Result<T, DataError>;

/// lti-data error types
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decode failed for {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Pickle decode failed: {0}")]
    Pickle(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No samples found under {0}")]
    Empty(PathBuf),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<toml::de::Error> for DataError {
    fn from(err: toml::de::Error) -> Self {
        DataError::ConfigError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DataError {
    fn from(err: ndarray::ShapeError) -> Self {
        DataError::ShapeMismatch {
            expected: "consistent tensor layout".into(),
            actual: err.to_string(),
        }
    }
}

#[cfg(feature = "download")]
impl From<zip::result::ZipError> for DataError {
    fn from(err: zip::result::ZipError) -> Self {
        DataError::Download(format!("bad zip archive: {err}"))
    }
}
