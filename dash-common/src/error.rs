//! Common error types for the dashboard services

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for dashboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the dashboard crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error outside the cache tiers (config files, directories)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be represented as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The durable cache tier refused a read or write for `key`
    #[error("Cache storage failed for {key}: {source}")]
    Storage {
        key: String,
        source: std::io::Error,
    },

    /// A durable cache entry exists but is not a valid `{data, timestamp, ttl}` record
    #[error("Corrupt cache entry {key}: {source}")]
    CorruptEntry {
        key: String,
        source: serde_json::Error,
    },

    /// The configured log file could not be opened
    #[error("Cannot open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Durable-tier I/O failure for `key`
    pub fn storage(key: &str, source: std::io::Error) -> Self {
        Error::Storage {
            key: key.to_string(),
            source,
        }
    }
}
