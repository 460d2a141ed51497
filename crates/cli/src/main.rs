//! airshipUI CLI - Main Entry Point
//!
//! A headless operator console for the airshipUI backend: it drives the
//! same client library a browser front end would, printing notices and
//! tables instead of rendering views.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod console;
mod output;

use airshipui_client::ClientConfig;
use commands::{auth, baremetal, config, document, history, image, phase, secret, watch, Globals};

/// airshipUI CLI - operator console for airshipctl
#[derive(Parser)]
#[command(name = "airshipui")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Client configuration file
    #[arg(long, env = "AIRSHIPUI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Backend WebSocket endpoint, overrides the configuration file
    #[arg(long, env = "AIRSHIPUI_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Seconds to wait for the backend
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the backend
    Login {
        /// User id
        id: String,

        /// Password
        #[arg(long, env = "AIRSHIPUI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the cached credentials
    Logout,

    /// Show connection and session status
    Status,

    /// Secrets
    #[command(subcommand)]
    Secret(secret::SecretCommands),

    /// Operation history
    History(history::HistoryArgs),

    /// Bare metal hosts and phases
    #[command(subcommand)]
    Baremetal(baremetal::BaremetalCommands),

    /// Phases
    #[command(subcommand)]
    Phase(phase::PhaseCommands),

    /// Documents
    #[command(subcommand)]
    Document(document::DocumentCommands),

    /// Generate the bootable ISO
    Image,

    /// Follow backend logs and task progress
    Watch,

    /// Client and airshipctl configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(airshipui_common::default_config_path);
    let mut config = ClientConfig::load(&config_path)?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    let globals = Globals {
        config,
        config_path,
        format: cli.format,
        timeout: Duration::from_secs(cli.timeout),
    };

    match cli.command {
        Commands::Login { id, password } => auth::login(&globals, &id, &password).await?,
        Commands::Logout => auth::logout(&globals)?,
        Commands::Status => auth::status(&globals).await?,
        Commands::Secret(cmd) => secret::execute(cmd, &globals).await?,
        Commands::History(args) => history::execute(args, &globals).await?,
        Commands::Baremetal(cmd) => baremetal::execute(cmd, &globals).await?,
        Commands::Phase(cmd) => phase::execute(cmd, &globals).await?,
        Commands::Document(cmd) => document::execute(cmd, &globals).await?,
        Commands::Image => image::generate(&globals).await?,
        Commands::Watch => watch::execute(&globals).await?,
        Commands::Config(cmd) => config::execute(cmd, &globals).await?,
    }

    Ok(())
}
