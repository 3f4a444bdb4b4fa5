//! Chatpanel: the chat widget in a terminal.
//!
//! Lines typed on stdin drive the panel:
//! - `/open`, `/close`: toggle the panel
//! - `/quit`: exit
//! - anything else: typed into the input and sent (Enter), only while the
//!   panel is open

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatpanel_widget::{
    ChatWidget, CompletedSend, PanelState, PendingSend, SendStart, SessionStrategy, WidgetConfig,
};

mod terminal;

use terminal::TerminalView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SessionMode {
    /// Locally generated id sent with every message
    Anonymous,
    /// Server-managed cookie session with personalized greeting
    Cookie,
}

#[derive(Parser)]
#[command(name = "chatpanel")]
#[command(about = "Chat with a chatpanel backend from the terminal", long_about = None)]
struct Cli {
    /// Backend base URL (endpoints are {base}/chat/ and {base}/chat/session)
    #[arg(long, env = "CHATPANEL_BASE_URL")]
    base_url: String,

    /// Session strategy
    #[arg(long, env = "CHATPANEL_SESSION", value_enum, default_value = "anonymous")]
    session: SessionMode,

    /// Local store for the anonymous session id
    #[arg(long, env = "CHATPANEL_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// How long the first opening waits for session metadata, in milliseconds
    #[arg(long, env = "CHATPANEL_GREETING_TIMEOUT_MS", default_value = "1200")]
    greeting_timeout_ms: u64,

    /// Overall timeout per chat request, in seconds
    #[arg(long, env = "CHATPANEL_REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Render failures as bot lines instead of a separate error line
    #[arg(long)]
    no_error_slot: bool,
}

impl Cli {
    fn widget_config(&self) -> WidgetConfig {
        let session = match self.session {
            SessionMode::Anonymous => SessionStrategy::Anonymous {
                store_path: self.storage_path.clone(),
            },
            SessionMode::Cookie => SessionStrategy::Cookie,
        };

        WidgetConfig::new(&self.base_url)
            .with_session(session)
            .with_greeting_timeout(Duration::from_millis(self.greeting_timeout_ms))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "chatpanel=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let view = TerminalView::new(std::io::stdout(), !cli.no_error_slot);

    let mut widget = ChatWidget::bind(cli.widget_config(), view)
        .await
        .map_err(|e| miette::miette!("failed to start chat widget: {}", e))?
        .ok_or_else(|| miette::miette!("terminal surface is missing required elements"))?;

    println!("chatpanel: type /open to start chatting");
    run(&mut widget).await
}

/// What the event loop should do after a line of input.
#[derive(Debug)]
enum LineAction {
    Quit,
    Send(PendingSend),
    Idle,
}

async fn handle_line<W: Write>(widget: &mut ChatWidget<TerminalView<W>>, line: &str) -> LineAction {
    match line.trim() {
        "/quit" => return LineAction::Quit,
        "/open" => widget.open().await,
        "/close" => widget.close(),
        _ if widget.panel_state() == PanelState::Closed => {
            // The input lives inside the panel.
            eprintln!("(panel is closed, type /open first)");
        }
        _ => {
            widget.view_mut().type_input(line);
            match widget.begin_send() {
                SendStart::Started(pending) => return LineAction::Send(pending),
                SendStart::Busy => eprintln!("(still waiting for the last reply)"),
                SendStart::Ignored => {}
            }
        }
    }
    LineAction::Idle
}

async fn run(widget: &mut ChatWidget<TerminalView<std::io::Stdout>>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<JoinHandle<CompletedSend>> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.into_diagnostic()? else {
                    break;
                };
                match handle_line(widget, &line).await {
                    LineAction::Quit => break,
                    LineAction::Send(pending) => {
                        in_flight = Some(tokio::spawn(pending.execute()));
                    }
                    LineAction::Idle => {}
                }
            }
            completed = settle(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                widget.finish_send(completed.into_diagnostic()?);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(handle) = in_flight {
        handle.abort();
    }
    Ok(())
}

/// Wait for the in-flight send, or forever if there is none.
async fn settle(in_flight: &mut Option<JoinHandle<CompletedSend>>) -> Result<CompletedSend, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
