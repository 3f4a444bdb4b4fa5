//! Error types for the widget.

use thiserror::Error;

/// Errors that can occur while setting up or running the widget.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// Backend client error.
    #[error("client error: {0}")]
    Client(#[from] chatpanel_client::ClientError),

    /// Local store IO failed.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Local store contents are not valid JSON.
    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
