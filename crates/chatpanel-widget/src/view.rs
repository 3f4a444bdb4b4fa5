//! Rendering contract between the controller and a surface.
//!
//! A surface owns the visible elements (panel, toggle and close buttons, log,
//! input, send button, optional error slot). The controller only talks to it
//! through [`ChatView`]. Message text is always plain text: surfaces must not
//! interpret it as markup.

use std::collections::HashSet;

use chatpanel_client::Role;

/// Text shown in the typing placeholder.
pub const TYPING_TEXT: &str = "… generating";

/// Fixed element identifiers a surface must provide.
pub struct ElementIds;

impl ElementIds {
    pub const PANEL: &'static str = "chat-panel";
    pub const TOGGLE: &'static str = "chat-toggle";
    pub const CLOSE: &'static str = "chat-close";
    pub const LOG: &'static str = "chat-log";
    pub const INPUT: &'static str = "chat-input";
    pub const SEND: &'static str = "chat-send";
    /// Optional: failures are rendered inline in the log without it.
    pub const ERROR: &'static str = "chat-error";

    /// Elements without which the widget does not wire up at all.
    pub const REQUIRED: [&'static str; 6] = [
        Self::PANEL,
        Self::TOGGLE,
        Self::CLOSE,
        Self::LOG,
        Self::INPUT,
        Self::SEND,
    ];
}

/// Who a log line is attributed to on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    /// Style class for the line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Bot => "bot",
        }
    }
}

impl From<Role> for Speaker {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Speaker::User,
            Role::Assistant => Speaker::Bot,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Reference to a shown typing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypingHandle(pub u64);

/// A rendering surface for the chat panel.
pub trait ChatView {
    /// Whether the surface has the element with this identifier.
    fn has_element(&self, id: &str) -> bool;

    /// Append a plain text line to the log and scroll to the bottom.
    fn append_message(&mut self, speaker: Speaker, text: &str);

    /// Show the typing indicator, reusing the one already shown if any.
    fn show_typing(&mut self) -> TypingHandle;

    /// Remove the typing indicator. No-op if it is already gone.
    fn remove_typing(&mut self, handle: TypingHandle);

    fn input_text(&self) -> String;

    fn clear_input(&mut self);

    fn focus_input(&mut self);

    fn send_enabled(&self) -> bool;

    fn set_send_enabled(&mut self, enabled: bool);

    fn set_panel_visible(&mut self, visible: bool);

    fn set_toggle_visible(&mut self, visible: bool);

    /// Put `message` in the error slot and reveal it.
    fn show_error(&mut self, message: &str);

    fn hide_error(&mut self);

    /// Whether every required element is present.
    fn is_complete(&self) -> bool {
        ElementIds::REQUIRED.iter().all(|id| self.has_element(id))
    }

    fn has_error_slot(&self) -> bool {
        self.has_element(ElementIds::ERROR)
    }
}

/// A log line as recorded by [`MemoryView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub speaker: Speaker,
    pub text: String,
}

/// In-memory surface. Records everything the controller does to it.
#[derive(Debug, Clone)]
pub struct MemoryView {
    elements: HashSet<&'static str>,
    log: Vec<LogLine>,
    typing: Option<TypingHandle>,
    next_handle: u64,
    input: String,
    input_focused: bool,
    send_enabled: bool,
    panel_visible: bool,
    toggle_visible: bool,
    error: Option<String>,
    error_visible: bool,
}

impl MemoryView {
    /// A surface with every element, error slot included.
    pub fn new() -> Self {
        let mut elements: HashSet<&'static str> = ElementIds::REQUIRED.into_iter().collect();
        elements.insert(ElementIds::ERROR);

        Self {
            elements,
            log: Vec::new(),
            typing: None,
            next_handle: 0,
            input: String::new(),
            input_focused: false,
            send_enabled: true,
            panel_visible: false,
            toggle_visible: true,
            error: None,
            error_visible: false,
        }
    }

    /// Remove an element from the surface.
    pub fn without(mut self, id: &str) -> Self {
        self.elements.remove(id);
        self
    }

    /// Type into the input, replacing its contents.
    pub fn type_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    pub fn log(&self) -> &[LogLine] {
        &self.log
    }

    /// Log rendered as `speaker: text` lines.
    pub fn transcript(&self) -> Vec<String> {
        self.log
            .iter()
            .map(|line| format!("{}: {}", line.speaker, line.text))
            .collect()
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn toggle_visible(&self) -> bool {
        self.toggle_visible
    }

    /// Error slot text, if the slot is visible.
    pub fn visible_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|_| self.error_visible)
    }
}

impl Default for MemoryView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for MemoryView {
    fn has_element(&self, id: &str) -> bool {
        self.elements.contains(id)
    }

    fn append_message(&mut self, speaker: Speaker, text: &str) {
        self.log.push(LogLine {
            speaker,
            text: text.to_string(),
        });
    }

    fn show_typing(&mut self) -> TypingHandle {
        if let Some(handle) = self.typing {
            return handle;
        }
        let handle = TypingHandle(self.next_handle);
        self.next_handle += 1;
        self.typing = Some(handle);
        handle
    }

    fn remove_typing(&mut self, handle: TypingHandle) {
        if self.typing == Some(handle) {
            self.typing = None;
        }
    }

    fn input_text(&self) -> String {
        self.input.clone()
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn focus_input(&mut self) {
        self.input_focused = true;
    }

    fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn set_panel_visible(&mut self, visible: bool) {
        self.panel_visible = visible;
    }

    fn set_toggle_visible(&mut self, visible: bool) {
        self.toggle_visible = visible;
    }

    fn show_error(&mut self, message: &str) {
        if self.has_error_slot() {
            self.error = Some(message.to_string());
            self.error_visible = true;
        }
    }

    fn hide_error(&mut self) {
        self.error_visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_indicator_is_reused() {
        let mut view = MemoryView::new();
        let first = view.show_typing();
        let second = view.show_typing();

        assert_eq!(first, second);
        view.remove_typing(first);
        assert!(!view.is_typing());

        // Removing a stale handle is harmless.
        view.remove_typing(first);
        assert_ne!(view.show_typing(), first);
    }

    #[test]
    fn test_missing_required_element() {
        let view = MemoryView::new().without(ElementIds::SEND);
        assert!(!view.is_complete());

        let view = MemoryView::new().without(ElementIds::ERROR);
        assert!(view.is_complete());
        assert!(!view.has_error_slot());
    }

    #[test]
    fn test_markup_is_kept_verbatim() {
        let mut view = MemoryView::new();
        view.append_message(Speaker::Bot, "<b>hi</b>");
        assert_eq!(view.transcript(), vec!["bot: <b>hi</b>".to_string()]);
    }

    #[test]
    fn test_assistant_renders_as_bot() {
        assert_eq!(Speaker::from(Role::Assistant), Speaker::Bot);
        assert_eq!(Speaker::from(Role::User).as_str(), "user");
    }
}
