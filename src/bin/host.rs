//! Chat Widget terminal host
//!
//! Mounts one widget with a terminal renderer and drives it from stdin.
//!
//! Usage: `chat-widget-host <config.json> [--domain <host>] [--store <path>] [--mobile]`
//!
//! Lines are sent as messages; `/expand`, `/collapse`, `/close`, `/focus`
//! and `/quit` map to widget actions.

use anyhow::{Context, bail};
use chat_widget::{
    Action, Controller, InitOptions, VisualState,
    config::Config,
    conversation::{Message, Sender},
    history::preload_history,
    renderer::Renderer,
    store::{JsonFileStore, SqliteStore, StateStore},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

struct HostArgs {
    config_path: String,
    domain: String,
    store_path: String,
    mobile: bool,
}

fn parse_args() -> anyhow::Result<HostArgs> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut domain = "localhost".to_string();
    let mut store_path = "widget_state.json".to_string();
    let mut mobile = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--domain" => domain = args.next().context("--domain needs a value")?,
            "--store" => store_path = args.next().context("--store needs a value")?,
            "--mobile" => mobile = true,
            flag if flag.starts_with("--") => bail!("Unknown flag: {}", flag),
            path => config_path = Some(path.to_string()),
        }
    }

    Ok(HostArgs {
        config_path: config_path.context("Usage: chat-widget-host <config.json> [--domain <host>] [--store <path>] [--mobile]")?,
        domain,
        store_path,
        mobile,
    })
}

fn open_store(path: &str) -> anyhow::Result<Arc<dyn StateStore>> {
    if path.ends_with(".db") || path.ends_with(".sqlite") {
        Ok(Arc::new(SqliteStore::open(path)?))
    } else {
        Ok(Arc::new(JsonFileStore::open(path)?))
    }
}

/// Renderer printing widget changes to stdout
struct TerminalRenderer {
    mobile: bool,
}

impl TerminalRenderer {
    fn print(message: &Message) {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
        };
        if message.is_loading {
            println!("[{}] ...", who);
        } else {
            println!("[{}] {}", who, message.content);
        }
    }
}

impl Renderer for TerminalRenderer {
    fn mount(&mut self, config: &Config) {
        println!(
            "-- chat widget ({}, {:?}, theme {:?}) --",
            config.container, config.position, config.theme
        );
    }

    fn is_mobile_viewport(&self) -> bool {
        self.mobile
    }

    fn show_state(&mut self, state: VisualState, sheet: bool) {
        match (state, sheet) {
            (VisualState::Expanded, true) => println!("-- expanded (sheet) --"),
            (state, _) => println!("-- {} --", state),
        }
    }

    fn append_message(&mut self, _index: usize, message: &Message) {
        Self::print(message);
    }

    fn update_message(&mut self, _index: usize, message: &Message) {
        Self::print(message);
    }

    fn remove_message(&mut self, _index: usize) {}

    fn set_input_enabled(&mut self, _enabled: bool) {}

    fn show_error(&mut self, message: &str) {
        eprintln!("!! {}", message);
    }

    fn teardown(&mut self) {
        println!("-- widget closed --");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_widget::init();

    let args = parse_args()?;
    let mut options = InitOptions::load(&args.config_path)?;
    let session_store: Arc<dyn StateStore> =
        Arc::new(JsonFileStore::open(format!("{}.session", args.store_path))?);

    preload_history(&mut options, session_store.as_ref()).await?;

    let controller = Controller::new(args.domain, open_store(&args.store_path)?)
        .with_session_store(session_store);

    let widget = controller
        .init(options, Box::new(TerminalRenderer { mobile: args.mobile }))
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let action = match line.trim() {
            "" => continue,
            "/quit" => break,
            "/expand" => Action::Expand,
            "/collapse" => Action::Collapse,
            "/close" => Action::Close,
            "/focus" => Action::FocusInput,
            text => Action::SendMessage(text.to_string()),
        };

        if let Err(e) = controller.dispatch(Some(&widget), action).await {
            tracing::debug!("Action failed: {}", e);
        }
    }

    controller.unmount(None).await;
    Ok(())
}
