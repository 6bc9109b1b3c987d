use std::io;

use spendsync_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] spendsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("No {kind} found for id/prefix: {query}")]
    RecordNotFound { kind: String, query: String },
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error("Could not resolve a data directory; pass --db-path or set SPENDSYNC_DB_PATH")]
    NoDataDir,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Sync is not configured. Set SPENDSYNC_API_URL (and SPENDSYNC_API_TOKEN if required).")]
    SyncNotConfigured,
}

impl CliError {
    /// Map a configuration error; a missing API URL means sync was never set up.
    pub fn from_config(error: ConfigError) -> Self {
        match error {
            ConfigError::MissingVar(_) => Self::SyncNotConfigured,
            other => Self::Config(other),
        }
    }
}
