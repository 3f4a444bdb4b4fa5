//! Widget configuration.

use std::time::Duration;

use chatpanel_client::DEFAULT_REQUEST_TIMEOUT;

use crate::greeting::DEFAULT_WELCOME;
use crate::{SessionStrategy, WidgetError};

/// How long the first opening waits for session metadata.
pub const DEFAULT_GREETING_TIMEOUT: Duration = Duration::from_millis(1200);

/// Configuration for a [`crate::ChatWidget`].
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Backend base URL; endpoints are resolved relative to it.
    pub base_url: String,
    pub session: SessionStrategy,
    pub greeting_timeout: Duration,
    pub request_timeout: Duration,
    /// Greeting used when no personalized line can be built.
    pub welcome: String,
}

impl WidgetConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session: SessionStrategy::default(),
            greeting_timeout: DEFAULT_GREETING_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            welcome: DEFAULT_WELCOME.to_string(),
        }
    }

    pub fn with_session(mut self, session: SessionStrategy) -> Self {
        self.session = session;
        self
    }

    pub fn with_greeting_timeout(mut self, timeout: Duration) -> Self {
        self.greeting_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_welcome(mut self, welcome: impl Into<String>) -> Self {
        self.welcome = welcome.into();
        self
    }

    /// Check the configuration before anything touches the network.
    pub fn validate(&self) -> Result<(), WidgetError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(WidgetError::Config("base URL cannot be empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(WidgetError::Config(format!(
                "base URL must start with http:// or https://, got '{}'",
                base
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(WidgetError::Config(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
