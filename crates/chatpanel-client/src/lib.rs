//! HTTP client for the chatpanel backend.
//!
//! Two endpoints are consumed, relative to a configurable base URL:
//!
//! - `POST {base}/chat/`: send a message plus the running history, get a reply
//! - `GET {base}/chat/session`: optional metadata for a cookie-backed session

mod client;
mod error;
mod types;

pub use client::{ChatClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::ClientError;
pub use types::{ChatMessage, ChatReply, ChatRequest, Role, SessionMetadata};
