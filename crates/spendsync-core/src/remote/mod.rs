//! Remote store contract and its HTTP client.

mod http;
mod payload;

use std::future::Future;

use thiserror::Error;

pub use http::HttpRemoteStore;
pub use payload::{
    CategoryPayload, ChangeSet, CreatedRecord, ExpensePayload, IncomePayload, RecordPayload,
    RemoteCategory, RemoteExpense, RemoteIncome, RemoteRecord,
};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Returns true if the request can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            Self::Api { status, .. } => *status >= 500 || matches!(*status, 408 | 429),
            Self::InvalidConfiguration(_) | Self::InvalidPayload(_) => false,
        }
    }
}

/// The authoritative store the engine reconciles with.
pub trait RemoteStore: Send + Sync {
    /// `POST /<entity>`: create or upsert one record, returning the
    /// identifier the remote assigned (if it reports one).
    fn create(
        &self,
        payload: &RecordPayload,
    ) -> impl Future<Output = RemoteResult<CreatedRecord>> + Send;

    /// `GET /sync?since=<ms>`: every record, tombstones included, whose
    /// `updatedAt` is strictly greater than `since`.
    fn changes_since(&self, since: i64) -> impl Future<Output = RemoteResult<ChangeSet>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_classify_retryability() {
        let unavailable = RemoteError::Api {
            status: 503,
            message: "down".to_string(),
        };
        let throttled = RemoteError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        let rejected = RemoteError::Api {
            status: 422,
            message: "amount is required".to_string(),
        };
        assert!(unavailable.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(!RemoteError::InvalidPayload("bad".to_string()).is_retryable());
    }
}
