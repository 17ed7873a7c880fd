mod app;
mod config;
mod conversation;
mod handler;
mod logging;
mod markdown;
mod reply;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use app::App;
use config::{Config, ENDPOINT_ENV};
use conversation::Conversation;
use reply::HttpReplyClient;

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(version, about = "Chat with a remote AI endpoint from the terminal")]
struct Cli {
    /// Reply service URL (overrides $CHATBOT_ENDPOINT and the config file)
    #[arg(short, long)]
    endpoint: Option<String>,
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let log_path = match cli.log_file {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path, config.log_filter.as_deref())?;

    let env_endpoint = std::env::var(ENDPOINT_ENV).ok();
    let endpoint = config.resolve_endpoint(cli.endpoint.as_deref(), env_endpoint.as_deref());
    info!(%endpoint, "starting chatbot");

    let client = HttpReplyClient::new(&endpoint);
    let mut app = App::new(Conversation::new(Arc::new(client)), &endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    info!("exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_reply();
    }

    Ok(())
}
