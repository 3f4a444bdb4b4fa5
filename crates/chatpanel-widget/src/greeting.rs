//! One-time greeting shown when the panel first opens.

use std::future::Future;

use chatpanel_client::SessionMetadata;
use tokio::time::Instant;

/// Static welcome line.
pub const DEFAULT_WELCOME: &str = "Hello! I'm TrkElnIt's assistant. Tell me a bit about your project and I'll help however I can.";

/// Build the greeting line.
///
/// A personalized line needs at least a client name; anything less falls
/// back to `welcome`.
pub fn compose(metadata: Option<&SessionMetadata>, welcome: &str) -> String {
    let Some(meta) = metadata else {
        return welcome.to_string();
    };

    let name = meta.client_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let topic = meta.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());

    match (name, topic) {
        (Some(name), Some(topic)) => format!(
            "Welcome back, {}! Last time we talked about {}. Want to pick up where we left off?",
            name, topic
        ),
        (Some(name), None) => format!("Welcome back, {}! How can I help today?", name),
        _ => welcome.to_string(),
    }
}

/// Wait for `fut` until `deadline`; whichever settles first wins.
///
/// Returns `None` when the deadline passes first. The future is dropped in
/// that case, so its result is discarded.
pub async fn first_before<F, T>(fut: F, deadline: Instant) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout_at(deadline, fut).await.ok()
}
