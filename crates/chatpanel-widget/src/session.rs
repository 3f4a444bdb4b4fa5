//! Session bootstrap.
//!
//! Two strategies are supported:
//!
//! - **Anonymous**: a random identifier generated once, kept in the local
//!   store and sent as `session_id` with every message.
//! - **Cookie**: the backend owns the session through a cookie. No local
//!   identifier exists; instead a metadata fetch is issued at startup and its
//!   result personalizes the greeting if it arrives in time.

use std::path::PathBuf;
use std::time::Duration;

use chatpanel_client::{ChatClient, SessionMetadata};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::greeting::first_before;
use crate::store::{LocalStore, SESSION_STORAGE_KEY};

/// How the widget identifies the visitor to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStrategy {
    /// Client-generated identifier persisted in the local store.
    Anonymous {
        /// Store location; `None` uses [`LocalStore::default_path`].
        store_path: Option<PathBuf>,
    },
    /// Server-managed cookie session with metadata pre-fetch.
    Cookie,
}

impl Default for SessionStrategy {
    fn default() -> Self {
        SessionStrategy::Anonymous { store_path: None }
    }
}

/// A bootstrapped session.
#[derive(Debug)]
pub enum Session {
    Anonymous { id: String },
    Cookie { metadata: MetadataFetch },
}

impl Session {
    /// Set up the session for `strategy`.
    ///
    /// Never fails: a broken store degrades to an identifier that only lives
    /// as long as this session.
    pub async fn bootstrap(strategy: &SessionStrategy, client: &ChatClient) -> Self {
        match strategy {
            SessionStrategy::Anonymous { store_path } => Session::Anonymous {
                id: load_or_create_id(store_path.clone()).await,
            },
            SessionStrategy::Cookie => Session::Cookie {
                metadata: MetadataFetch::spawn(client.clone()),
            },
        }
    }

    /// Identifier to put in the request body, if this strategy sends one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Session::Anonymous { id } => Some(id),
            Session::Cookie { .. } => None,
        }
    }

    /// Metadata for the greeting, waiting at most `timeout`.
    pub async fn greeting_metadata(&mut self, timeout: Duration) -> Option<SessionMetadata> {
        match self {
            Session::Anonymous { .. } => None,
            Session::Cookie { metadata } => metadata.race(timeout).await,
        }
    }
}

async fn load_or_create_id(store_path: Option<PathBuf>) -> String {
    let mut store = match LocalStore::load_or_reset(store_path).await {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "failed to load local store, using ephemeral session id");
            return Uuid::new_v4().to_string();
        }
    };

    if let Some(id) = store.get(SESSION_STORAGE_KEY).filter(|id| !id.is_empty()) {
        debug!(session_id = %id, "reusing stored session id");
        return id.to_string();
    }

    let id = Uuid::new_v4().to_string();
    if let Err(e) = store.set(SESSION_STORAGE_KEY, &id).await {
        warn!(error = %e, path = %store.path().display(), "failed to persist session id");
    }
    debug!(session_id = %id, "generated new session id");
    id
}

/// The in-flight or settled session metadata fetch.
#[derive(Debug)]
pub struct MetadataFetch {
    state: FetchState,
}

#[derive(Debug)]
enum FetchState {
    Pending(JoinHandle<Option<SessionMetadata>>),
    Settled(Option<SessionMetadata>),
}

impl MetadataFetch {
    /// Start fetching in the background. Failures resolve to `None`.
    pub fn spawn(client: ChatClient) -> Self {
        let handle = tokio::spawn(async move {
            match client.session_metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(error = %e, "session metadata fetch failed");
                    None
                }
            }
        });

        Self {
            state: FetchState::Pending(handle),
        }
    }

    /// Race the fetch against `timeout`.
    ///
    /// The first call decides; the outcome is remembered and a fetch that
    /// lost the race is aborted.
    pub async fn race(&mut self, timeout: Duration) -> Option<SessionMetadata> {
        let result = match &mut self.state {
            FetchState::Settled(metadata) => return metadata.clone(),
            FetchState::Pending(handle) => {
                let deadline = Instant::now() + timeout;
                match first_before(&mut *handle, deadline).await {
                    Some(Ok(metadata)) => metadata,
                    Some(Err(e)) => {
                        warn!(error = %e, "session metadata task failed");
                        None
                    }
                    None => {
                        handle.abort();
                        debug!(timeout_ms = timeout.as_millis() as u64, "session metadata lost the race");
                        None
                    }
                }
            }
        };

        self.state = FetchState::Settled(result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_anonymous_id_is_generated_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let client = ChatClient::new("http://127.0.0.1:9").unwrap();
        let strategy = SessionStrategy::Anonymous {
            store_path: Some(path.clone()),
        };

        let first = Session::bootstrap(&strategy, &client).await;
        let second = Session::bootstrap(&strategy, &client).await;

        let id = first.session_id().unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(second.session_id(), Some(id.as_str()));

        let store = LocalStore::load(Some(path)).await.unwrap();
        assert_eq!(store.get(SESSION_STORAGE_KEY), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_anonymous_empty_stored_id_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = LocalStore::load(Some(path.clone())).await.unwrap();
        store.set(SESSION_STORAGE_KEY, "").await.unwrap();

        let client = ChatClient::new("http://127.0.0.1:9").unwrap();
        let session = Session::bootstrap(
            &SessionStrategy::Anonymous {
                store_path: Some(path),
            },
            &client,
        )
        .await;

        assert!(!session.session_id().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_corrupt_store_is_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        tokio::fs::write(&path, "{{{").await.unwrap();

        let client = ChatClient::new("http://127.0.0.1:9").unwrap();
        let strategy = SessionStrategy::Anonymous {
            store_path: Some(path.clone()),
        };

        let mut first = Session::bootstrap(&strategy, &client).await;
        let second = Session::bootstrap(&strategy, &client).await;

        let id = first.session_id().unwrap().to_string();
        assert_eq!(second.session_id(), Some(id.as_str()));

        let store = LocalStore::load(Some(path)).await.unwrap();
        assert_eq!(store.get(SESSION_STORAGE_KEY), Some(id.as_str()));
        assert_eq!(first.greeting_metadata(Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn test_settled_fetch_returns_immediately() {
        let meta = SessionMetadata {
            client_name: Some("Sam".into()),
            topic: None,
        };
        let mut fetch = MetadataFetch {
            state: FetchState::Settled(Some(meta.clone())),
        };

        assert_eq!(fetch.race(Duration::ZERO).await, Some(meta));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_fetch_loses_and_stays_lost() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Some(SessionMetadata::default())
        });
        let mut fetch = MetadataFetch {
            state: FetchState::Pending(handle),
        };

        assert_eq!(fetch.race(Duration::from_millis(1200)).await, None);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(fetch.race(Duration::from_secs(10)).await, None);
    }

    #[tokio::test]
    async fn test_cookie_session_has_no_id() {
        let client = ChatClient::new("http://127.0.0.1:9").unwrap();
        let mut session = Session::bootstrap(&SessionStrategy::Cookie, &client).await;

        assert_eq!(session.session_id(), None);
        // Unreachable backend: the fetch fails and resolves to no metadata.
        assert_eq!(session.greeting_metadata(Duration::from_secs(5)).await, None);
    }
}
