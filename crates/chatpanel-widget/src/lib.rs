//! Embeddable chat panel controller.
//!
//! A [`ChatWidget`] drives any surface implementing [`ChatView`]: a floating
//! panel that toggles open and closed, a conversation log, a typing indicator
//! while a reply is pending, and a one-time greeting on first opening.
//!
//! ## Sessions
//!
//! - **Anonymous**: random identifier kept in a [`LocalStore`], sent with
//!   every message
//! - **Cookie**: server-side session; metadata is pre-fetched to personalize
//!   the greeting and raced against a short timeout
//!
//! History lives in memory only and is gone when the widget is dropped.

mod config;
mod error;
pub mod greeting;
mod session;
mod store;
pub mod view;
mod widget;

pub use config::{DEFAULT_GREETING_TIMEOUT, WidgetConfig};
pub use error::WidgetError;
pub use session::{MetadataFetch, Session, SessionStrategy};
pub use store::{HISTORY_STORAGE_KEY, LocalStore, SESSION_STORAGE_KEY};
pub use view::{ChatView, ElementIds, LogLine, MemoryView, Speaker, TypingHandle};
pub use widget::{
    ChatWidget, CompletedSend, INLINE_ERROR_TEXT, PanelState, PendingSend,
    SendOutcome, SendStart, WidgetEvent,
};

pub use chatpanel_client::{ChatMessage, Role, SessionMetadata};
