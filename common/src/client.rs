//! HTTP client for talking to a running voice-transcribe server.

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};

use crate::api::{ErrorResponse, HealthResponse, TranscribeRequest, TranscribeResponse};

/// Default server URL, matching the server's default listen port.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8001";

/// Thin wrapper over `reqwest::Client` bound to one server.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:8001`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach server at {}", self.base_url))?;

        parse_json(response).await
    }

    /// Submit audio to `POST /transcribe`.
    pub async fn transcribe(&self, request: &TranscribeRequest) -> Result<TranscribeResponse> {
        let url = format!("{}/transcribe", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach server at {}", self.base_url))?;

        parse_json(response).await
    }

    /// Check if a server answers on the health endpoint.
    pub async fn is_server_running(&self) -> bool {
        self.health().await.is_ok()
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{}", error_message(status, &body));
    }

    response
        .json()
        .await
        .context("Failed to decode server response")
}

/// Render a non-2xx response, preferring the server's `detail` field.
pub fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => format!("Server returned {}: {}", status, error.detail),
        Err(_) if body.trim().is_empty() => format!("Server returned {}", status),
        Err(_) => format!("Server returned {}: {}", status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = Client::new("http://localhost:8001/");
        assert_eq!(client.base_url(), "http://localhost:8001");
    }

    #[test]
    fn test_error_message_uses_detail() {
        let message = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Invalid base64 audio"}"#,
        );
        assert_eq!(message, "Server returned 400 Bad Request: Invalid base64 audio");
    }

    #[test]
    fn test_error_message_plain_body() {
        let message = error_message(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(message, "Server returned 502 Bad Gateway: upstream down");

        let message = error_message(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(message, "Server returned 500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is essentially never served over HTTP locally.
        let client = Client::new("http://127.0.0.1:9");
        assert!(!client.is_server_running().await);
    }
}
