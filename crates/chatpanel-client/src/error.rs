//! Error types for the chat backend client.

use thiserror::Error;

/// Errors that can occur when talking to the chat backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Chatbot error {status}")]
    Status { status: u16 },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered 2xx with a body we cannot use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
