use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default chat endpoint path, relative to the backend base URL.
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";
/// Default upload endpoint path, relative to the backend base URL.
pub const DEFAULT_UPLOAD_PATH: &str = "/api/upload";
/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "chat-widget.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CHAT_WIDGET_CONFIG")]
    pub config: Option<String>,

    /// Backend base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, env = "CHAT_WIDGET_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Chat from the terminal (default)
    Chat,
    /// Serve the browser widget and forward its API calls to the backend
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub widget: WidgetConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub chat_path: String,
    pub upload_path: String,
    /// Per-request timeout. Unset leaves only the transport's own limits.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub title: String,
    #[serde(default)]
    pub greeting: Option<String>,
    /// Keep only the newest N entries. Unset or 0 keeps everything.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl WidgetConfig {
    /// Greeting to open the transcript with; empty disables it.
    pub fn greeting(&self) -> Option<&str> {
        self.greeting
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Build the layered configuration.
    ///
    /// Priority: CLI flag > `CHAT_WIDGET_*` env > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("backend.base_url", "http://127.0.0.1:5000")?
            .set_default("backend.chat_path", DEFAULT_CHAT_PATH)?
            .set_default("backend.upload_path", DEFAULT_UPLOAD_PATH)?
            .set_default("widget.title", "Chat Assistant")?
            .set_default("widget.greeting", "Hello! How can I help you today?")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("logging.json", false)?;

        // An explicit file must exist; the working-directory fallback is optional.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // E.g. CHAT_WIDGET_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHAT_WIDGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = &cli.backend_url {
            builder = builder.set_override("backend.base_url", url.as_str())?;
        }
        if cli.log_json {
            builder = builder.set_override("logging.json", true)?;
        }
        if let Some(Command::Serve { host, port }) = &cli.command {
            if let Some(host) = host {
                builder = builder.set_override("server.host", host.as_str())?;
            }
            if let Some(port) = port {
                builder = builder.set_override("server.port", i64::from(*port))?;
            }
        }

        builder.build()?.try_deserialize()
    }
}
