//! Error types for persistence and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the durable key-value store.
///
/// `Read` and `Malformed` happen at startup and are recovered by starting
/// with an empty list. `Write` and `Encode` happen after a mutation and are
/// recovered by keeping the in-memory list. None of them reach the user.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read key '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed task list under key '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write key '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode task list for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    #[cfg(test)]
    pub(crate) fn is_read(&self) -> bool {
        matches!(self, PersistenceError::Read { .. } | PersistenceError::Malformed { .. })
    }
}

/// Failures loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
