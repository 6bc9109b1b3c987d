//! Error types for spendsync-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using spendsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in spendsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote store error
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_their_message() {
        let error = Error::from(RemoteError::Api {
            status: 503,
            message: "maintenance".to_string(),
        });
        assert!(error.to_string().contains("maintenance"));
        assert!(matches!(error, Error::Remote(RemoteError::Api { status: 503, .. })));
    }
}
