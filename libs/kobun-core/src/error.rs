//! Error types for kobun-core.

use thiserror::Error;

/// Result type alias using LoadError.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while reading a question bank from disk.
///
/// Parsing itself never fails; malformed rows are skipped.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read question bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised when parsing configuration values from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown fold direction: {0}")]
    UnknownFoldDirection(String),

    #[error("unknown sink mode: {0}")]
    UnknownSinkMode(String),
}
