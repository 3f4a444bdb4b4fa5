//! The chat panel controller.

use chatpanel_client::{ChatClient, ChatMessage, ChatReply, ChatRequest, ClientError};
use tracing::{debug, info, warn};

use crate::greeting;
use crate::view::{ChatView, Speaker, TypingHandle};
use crate::{Session, WidgetConfig, WidgetError};

/// Bot line used for failures when the surface has no error slot.
pub const INLINE_ERROR_TEXT: &str = "Oops, something went wrong.";

/// Panel visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Open,
}

/// User interactions a surface forwards to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// Toggle button activated.
    Toggle,
    /// Close button activated.
    Close,
    /// Send button activated.
    SendClicked,
    /// Key pressed in the input.
    KeyDown(String),
}

/// Result of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty or whitespace; nothing happened.
    Ignored,
    /// Another send is still waiting for its reply; nothing happened.
    Busy,
    /// Reply received and appended.
    Delivered,
    /// The request failed and the failure was surfaced.
    Failed,
}

/// First half of a send.
#[derive(Debug)]
pub enum SendStart {
    Ignored,
    Busy,
    Started(PendingSend),
}

/// A send whose user turn is already on screen, awaiting the backend.
#[derive(Debug)]
pub struct PendingSend {
    client: ChatClient,
    request: ChatRequest,
    typing: TypingHandle,
    send_was_enabled: bool,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// Issue the request. Owns everything it needs, so it can be spawned or
    /// raced against other events.
    pub async fn execute(self) -> CompletedSend {
        let result = self.client.send(&self.request).await;
        CompletedSend {
            typing: self.typing,
            send_was_enabled: self.send_was_enabled,
            result,
        }
    }
}

/// A send whose request has settled, ready for [`ChatWidget::finish_send`].
#[derive(Debug)]
pub struct CompletedSend {
    typing: TypingHandle,
    send_was_enabled: bool,
    result: Result<ChatReply, ClientError>,
}

/// Controller for one chat panel, from bind to drop.
pub struct ChatWidget<V: ChatView> {
    view: V,
    client: ChatClient,
    session: Session,
    config: WidgetConfig,
    history: Vec<ChatMessage>,
    panel: PanelState,
    greeted: bool,
    pending: bool,
}

impl<V: ChatView> ChatWidget<V> {
    /// Wire a widget onto `view`.
    ///
    /// Returns `Ok(None)` without touching the network if the surface lacks a
    /// required element.
    pub async fn bind(config: WidgetConfig, view: V) -> Result<Option<Self>, WidgetError> {
        Self::bind_with_history(config, view, Vec::new()).await
    }

    /// Wire a widget and replay `history` into the log.
    ///
    /// A non-empty history counts as already greeted.
    pub async fn bind_with_history(
        config: WidgetConfig,
        mut view: V,
        history: Vec<ChatMessage>,
    ) -> Result<Option<Self>, WidgetError> {
        if !view.is_complete() {
            debug!("required chat elements missing, widget not wired");
            return Ok(None);
        }
        config.validate()?;

        let client = ChatClient::with_timeout(&config.base_url, config.request_timeout)?;
        let session = Session::bootstrap(&config.session, &client).await;

        for message in &history {
            view.append_message(message.role.into(), &message.content);
        }
        view.set_panel_visible(false);
        view.set_toggle_visible(true);

        info!(
            base_url = %client.base_url(),
            anonymous = session.session_id().is_some(),
            "chat widget bound"
        );

        Ok(Some(Self {
            view,
            client,
            session,
            config,
            greeted: !history.is_empty(),
            history,
            panel: PanelState::Closed,
            pending: false,
        }))
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn panel_state(&self) -> PanelState {
        self.panel
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.session_id()
    }

    /// Whether a send is waiting for its reply.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Route a surface event. Returns the send outcome for send events.
    pub async fn dispatch(&mut self, event: WidgetEvent) -> Option<SendOutcome> {
        debug!(?event, "dispatching widget event");
        match event {
            WidgetEvent::Toggle => {
                self.open().await;
                None
            }
            WidgetEvent::Close => {
                self.close();
                None
            }
            WidgetEvent::SendClicked => Some(self.handle_send().await),
            WidgetEvent::KeyDown(key) if key == "Enter" => Some(self.handle_send().await),
            WidgetEvent::KeyDown(_) => None,
        }
    }

    /// Show the panel. The first opening appends the greeting.
    pub async fn open(&mut self) {
        if self.panel == PanelState::Closed {
            self.panel = PanelState::Open;
            self.view.set_panel_visible(true);
            self.view.set_toggle_visible(false);
            debug!("panel opened");
        }

        if !self.greeted {
            let metadata = self
                .session
                .greeting_metadata(self.config.greeting_timeout)
                .await;
            let line = greeting::compose(metadata.as_ref(), &self.config.welcome);
            self.view.append_message(Speaker::Bot, &line);
            self.greeted = true;
        }

        self.view.focus_input();
    }

    /// Hide the panel. In-flight replies still land in the log.
    pub fn close(&mut self) {
        if self.panel == PanelState::Open {
            self.panel = PanelState::Closed;
            self.view.set_panel_visible(false);
            self.view.set_toggle_visible(true);
            debug!("panel closed");
        }
    }

    /// Send the input's text and wait for the reply.
    pub async fn handle_send(&mut self) -> SendOutcome {
        match self.begin_send() {
            SendStart::Ignored => SendOutcome::Ignored,
            SendStart::Busy => SendOutcome::Busy,
            SendStart::Started(pending) => {
                let completed = pending.execute().await;
                self.finish_send(completed)
            }
        }
    }

    /// Render the user turn and prepare the request.
    ///
    /// Rejects while an earlier send is pending, leaving the input untouched.
    pub fn begin_send(&mut self) -> SendStart {
        let message = self.view.input_text().trim().to_string();
        if message.is_empty() {
            return SendStart::Ignored;
        }
        if self.pending {
            debug!("send rejected, reply still pending");
            return SendStart::Busy;
        }

        self.view.append_message(Speaker::User, &message);
        self.history.push(ChatMessage::user(message.clone()));
        self.view.clear_input();

        let send_was_enabled = self.view.send_enabled();
        self.view.set_send_enabled(false);
        self.view.hide_error();
        let typing = self.view.show_typing();
        self.pending = true;

        let request = ChatRequest {
            session_id: self.session.session_id().map(str::to_string),
            message,
            history: self.history.clone(),
        };

        SendStart::Started(PendingSend {
            client: self.client.clone(),
            request,
            typing,
            send_was_enabled,
        })
    }

    /// Render the settled request and restore the controls.
    pub fn finish_send(&mut self, completed: CompletedSend) -> SendOutcome {
        self.view.remove_typing(completed.typing);

        let outcome = match completed.result {
            Ok(reply) => {
                self.view.append_message(Speaker::Bot, &reply.reply);
                self.history.push(ChatMessage::assistant(reply.reply));
                SendOutcome::Delivered
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.surface_error(&e);
                SendOutcome::Failed
            }
        };

        self.view.set_send_enabled(completed.send_was_enabled);
        self.view.focus_input();
        self.pending = false;
        outcome
    }

    fn surface_error(&mut self, error: &ClientError) {
        if self.view.has_error_slot() {
            self.view.show_error(&error.to_string());
        } else {
            self.view.append_message(Speaker::Bot, INLINE_ERROR_TEXT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::MemoryView;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn offline_widget(view: MemoryView) -> ChatWidget<MemoryView> {
        ChatWidget {
            view,
            client: ChatClient::new("http://127.0.0.1:9").unwrap(),
            session: Session::Anonymous { id: "abc".into() },
            config: WidgetConfig::new("http://127.0.0.1:9"),
            history: Vec::new(),
            panel: PanelState::Closed,
            greeted: false,
            pending: false,
        }
    }

    fn completed(pending: PendingSend, result: Result<ChatReply, ClientError>) -> CompletedSend {
        CompletedSend {
            typing: pending.typing,
            send_was_enabled: pending.send_was_enabled,
            result,
        }
    }

    proptest! {
        #[test]
        fn whitespace_input_is_ignored(input in "[ \t\r\n]{0,20}") {
            let mut view = MemoryView::new();
            view.type_input(&input);
            let mut widget = offline_widget(view);

            prop_assert!(matches!(widget.begin_send(), SendStart::Ignored));
            prop_assert!(widget.view().log().is_empty());
            prop_assert!(widget.history().is_empty());
            prop_assert!(widget.view().send_enabled());
            prop_assert!(!widget.is_pending());
        }

        #[test]
        fn message_is_trimmed(body in "[a-zA-Z0-9?!]{1,20}", pad in "[ \t]{0,5}") {
            let mut view = MemoryView::new();
            view.type_input(&format!("{pad}{body}{pad}"));
            let mut widget = offline_widget(view);

            match widget.begin_send() {
                SendStart::Started(pending) => prop_assert_eq!(&pending.request().message, &body),
                other => prop_assert!(false, "unexpected start: {:?}", other),
            }
        }
    }

    #[test]
    fn test_begin_send_renders_optimistically() {
        let mut view = MemoryView::new();
        view.type_input("  Hello ");
        let mut widget = offline_widget(view);

        let SendStart::Started(pending) = widget.begin_send() else {
            panic!("send did not start");
        };

        assert_eq!(widget.view().transcript(), vec!["user: Hello".to_string()]);
        assert_eq!(widget.history(), &[ChatMessage::user("Hello")]);
        assert_eq!(widget.view().input_text(), "");
        assert!(!widget.view().send_enabled());
        assert!(widget.view().is_typing());
        assert!(widget.is_pending());

        let request = pending.request();
        assert_eq!(request.session_id.as_deref(), Some("abc"));
        assert_eq!(request.history, vec![ChatMessage::user("Hello")]);
    }

    #[test]
    fn test_second_send_while_pending_is_busy() {
        let mut view = MemoryView::new();
        view.type_input("first");
        let mut widget = offline_widget(view);

        let SendStart::Started(pending) = widget.begin_send() else {
            panic!("send did not start");
        };

        widget.view_mut().type_input("second");
        assert!(matches!(widget.begin_send(), SendStart::Busy));
        assert_eq!(widget.view().log().len(), 1);
        assert_eq!(widget.view().input_text(), "second");

        let outcome = widget.finish_send(completed(
            pending,
            Ok(ChatReply {
                reply: "one".into(),
            }),
        ));
        assert_eq!(outcome, SendOutcome::Delivered);
        assert!(!widget.is_pending());

        assert!(matches!(widget.begin_send(), SendStart::Started(_)));
    }

    #[test]
    fn test_late_reply_lands_after_close() {
        let mut view = MemoryView::new();
        view.type_input("Hello");
        let mut widget = offline_widget(view);
        widget.greeted = true;

        let SendStart::Started(pending) = widget.begin_send() else {
            panic!("send did not start");
        };
        widget.close();

        widget.finish_send(completed(
            pending,
            Ok(ChatReply {
                reply: "Hi there".into(),
            }),
        ));

        assert_eq!(widget.panel_state(), PanelState::Closed);
        assert_eq!(
            widget.view().transcript(),
            vec!["user: Hello".to_string(), "bot: Hi there".to_string()]
        );
    }

    #[test]
    fn test_failure_without_error_slot_is_inline() {
        let mut view = MemoryView::new().without(crate::ElementIds::ERROR);
        view.type_input("Hello");
        let mut widget = offline_widget(view);

        let SendStart::Started(pending) = widget.begin_send() else {
            panic!("send did not start");
        };
        let outcome = widget.finish_send(completed(pending, Err(ClientError::Status { status: 502 })));

        assert_eq!(outcome, SendOutcome::Failed);
        assert_eq!(
            widget.view().transcript(),
            vec!["user: Hello".to_string(), format!("bot: {}", INLINE_ERROR_TEXT)]
        );
        assert!(widget.view().send_enabled());
        assert!(widget.view().input_focused());
        assert!(!widget.view().is_typing());
    }

    #[test]
    fn test_failure_with_error_slot_shows_error_text() {
        let mut view = MemoryView::new();
        view.type_input("Hello");
        let mut widget = offline_widget(view);

        let SendStart::Started(pending) = widget.begin_send() else {
            panic!("send did not start");
        };
        let error = ClientError::InvalidResponse("missing field `reply`".into());
        let outcome = widget.finish_send(completed(pending, Err(error)));

        assert_eq!(outcome, SendOutcome::Failed);
        assert_eq!(
            widget.view().visible_error(),
            Some("invalid response: missing field `reply`")
        );
        assert_eq!(widget.view().transcript(), vec!["user: Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_other_keys_do_nothing() {
        let mut view = MemoryView::new();
        view.type_input("Hello");
        let mut widget = offline_widget(view);

        let outcome = widget.dispatch(WidgetEvent::KeyDown("a".into())).await;
        assert_eq!(outcome, None);
        assert!(widget.view().log().is_empty());
    }

    #[tokio::test]
    async fn test_open_close_is_idempotent() {
        let mut widget = offline_widget(MemoryView::new());

        widget.close();
        assert_eq!(widget.panel_state(), PanelState::Closed);

        widget.open().await;
        widget.open().await;
        assert_eq!(widget.panel_state(), PanelState::Open);
        assert!(widget.view().panel_visible());
        assert!(!widget.view().toggle_visible());
        assert_eq!(widget.view().log().len(), 1);

        widget.close();
        widget.close();
        assert!(!widget.view().panel_visible());
        assert!(widget.view().toggle_visible());
    }
}
