//! Error types for the localization daemon.

use thiserror::Error;

/// Top-level error type.
///
/// Per-scan rejections (stale scan, failed registration, implausible
/// correction) are not errors; they are logged and the scan is dropped.
/// This type covers failures that prevent the daemon from running at all.
#[derive(Error, Debug)]
pub enum LocalizationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cloud format error: {0}")]
    CloudFormat(String),
}

impl From<toml::de::Error> for LocalizationError {
    fn from(e: toml::de::Error) -> Self {
        LocalizationError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LocalizationError>;
