//! HTTP client for the remote store.

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::util::compact_text;

use super::payload::{ChangeSet, CreatedRecord, RecordPayload};
use super::{RemoteError, RemoteResult, RemoteStore};

#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemoteStore {
    pub fn new(config: &SyncConfig) -> RemoteResult<Self> {
        if config.api_base_url.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "API base URL must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            client: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match self.auth_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn create(&self, payload: &RecordPayload) -> RemoteResult<CreatedRecord> {
        let endpoint = payload.kind().endpoint();
        let response = self
            .authorize(self.client.post(self.url(endpoint)))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(CreatedRecord::default());
        }
        serde_json::from_str(&body).map_err(|error| {
            RemoteError::InvalidPayload(format!("create {endpoint} response: {error}"))
        })
    }

    async fn changes_since(&self, since: i64) -> RemoteResult<ChangeSet> {
        let response = self
            .authorize(self.client.get(self.url("sync")))
            .query(&[("since", since)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|error| RemoteError::InvalidPayload(format!("sync response: {error}")))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn api_error(status: StatusCode, body: &str) -> RemoteError {
    RemoteError::Api {
        status: status.as_u16(),
        message: parse_api_error(status, body),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_error_prefers_json_message() {
        let message = parse_api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"amount is required"}"#,
        );
        assert_eq!(message, "amount is required");
    }

    #[test]
    fn parse_api_error_falls_back_to_status() {
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
    }

    #[test]
    fn client_joins_paths_and_redacts_token() {
        let config = SyncConfig::new("https://api.example.com/")
            .unwrap()
            .with_auth_token("secret");
        let remote = HttpRemoteStore::new(&config).unwrap();
        assert_eq!(remote.url("expenses"), "https://api.example.com/expenses");

        let debug = format!("{remote:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
