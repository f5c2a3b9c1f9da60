//! Chat widget entry point.
//!
//! `chat` (default) runs the terminal front-end; `serve` serves the browser
//! widget and forwards its API calls to the backend.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chat_widget::api::HttpBackend;
use chat_widget::config::{AppConfig, Cli, Command};
use chat_widget::widget::ChatWidget;
use chat_widget::{server, terminal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env-backed flags
    let _ = dotenv();

    let cli = Cli::parse();
    let config = match AppConfig::from_cli(&cli) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.logging.json);

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let backend = HttpBackend::from_config(&config.backend)?;
            info!(
                name: "widget.started",
                backend = %backend.base_url(),
                "Terminal widget started"
            );
            let widget = ChatWidget::from_config(Arc::new(backend), &config.widget);
            terminal::run(widget, &config.widget.title).await
        }
        Command::Serve { .. } => server::start_server(config).await,
    }
}

/// Initialize tracing (M-LOG-STRUCTURED). Logs go to stderr so stdout stays
/// free for the transcript.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
