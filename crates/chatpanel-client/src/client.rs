//! Chat backend client implementation.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{ChatReply, ChatRequest, ClientError, SessionMetadata};

/// Default overall request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the chat backend.
///
/// The underlying HTTP client keeps a cookie jar, so a session cookie set by
/// `GET /chat/session` is sent back on every later `POST /chat/`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    /// Create a new client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a new client with a custom overall request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { http, base_url })
    }

    /// Get the base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one chat turn and wait for the reply.
    #[tracing::instrument(skip(self, request), fields(history_len = request.history.len()))]
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let url = format!("{}/chat/", self.base_url);

        let response = self.http.post(&url).json(request).send().await?;
        let reply: ChatReply = Self::handle_response(response).await?;

        debug!(reply_len = reply.reply.len(), "received chat reply");
        Ok(reply)
    }

    /// Fetch the server-side session metadata.
    ///
    /// A `null` or empty body means the server has nothing on record.
    #[tracing::instrument(skip(self))]
    pub async fn session_metadata(&self) -> Result<Option<SessionMetadata>, ClientError> {
        let url = format!("{}/chat/session", self.base_url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        let metadata: Option<SessionMetadata> = serde_json::from_str(&text)?;
        debug!(found = metadata.is_some(), "fetched session metadata");
        Ok(metadata)
    }

    /// Map non-2xx to an error and decode the body otherwise.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}
