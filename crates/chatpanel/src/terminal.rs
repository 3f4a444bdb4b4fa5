//! Terminal surface for the chat panel.
//!
//! The log is kept in memory and printed while the panel is visible; opening
//! the panel redraws the whole log, including replies that landed while it
//! was closed.

use std::io::Write;

use chatpanel_widget::{ChatView, ElementIds, LogLine, Speaker, TypingHandle, view::TYPING_TEXT};

pub struct TerminalView<W: Write> {
    out: W,
    error_slot: bool,
    log: Vec<LogLine>,
    printed: usize,
    typing: Option<TypingHandle>,
    next_handle: u64,
    input: String,
    send_enabled: bool,
    panel_visible: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, error_slot: bool) -> Self {
        Self {
            out,
            error_slot,
            log: Vec::new(),
            printed: 0,
            typing: None,
            next_handle: 0,
            input: String::new(),
            send_enabled: true,
            panel_visible: false,
        }
    }

    pub fn type_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    // Terminal write failures are not actionable here.
    fn emit(&mut self, line: &str) {
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }

    fn flush_log(&mut self) {
        if !self.panel_visible {
            return;
        }
        while self.printed < self.log.len() {
            let line = &self.log[self.printed];
            let rendered = format!("{:>4} │ {}", line.speaker, line.text);
            self.printed += 1;
            self.emit(&rendered);
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn has_element(&self, id: &str) -> bool {
        id != ElementIds::ERROR || self.error_slot
    }

    fn append_message(&mut self, speaker: Speaker, text: &str) {
        self.log.push(LogLine {
            speaker,
            text: text.to_string(),
        });
        self.flush_log();
    }

    fn show_typing(&mut self) -> TypingHandle {
        if let Some(handle) = self.typing {
            return handle;
        }
        let handle = TypingHandle(self.next_handle);
        self.next_handle += 1;
        self.typing = Some(handle);
        if self.panel_visible {
            self.emit(&format!("{:>4} │ {}", Speaker::Bot, TYPING_TEXT));
        }
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

    fn focus_input(&mut self) {}

    fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn set_panel_visible(&mut self, visible: bool) {
        if visible == self.panel_visible {
            return;
        }
        self.panel_visible = visible;
        if visible {
            self.emit("── chat ── (/close to hide, /quit to exit)");
            self.printed = 0;
            self.flush_log();
        } else {
            self.emit("── chat hidden ── (/open to show)");
        }
    }

    fn set_toggle_visible(&mut self, _visible: bool) {}

    fn show_error(&mut self, message: &str) {
        if self.error_slot {
            self.emit(&format!("   ! │ {}", message));
        }
    }

    fn hide_error(&mut self) {}
}
