//! clawbridge CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Relay Telegram messages to the agent
//! - `chat`    — Same pipeline over stdin/stdout
//! - `format`  — Render raw agent output the way the bridge would
//! - `status`  — Show effective configuration
//! - `doctor`  — Diagnose setup problems
//! - `init`    — Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clawbridge_config::RenderStyle;

mod commands;

#[derive(Parser)]
#[command(
    name = "clawbridge",
    about = "clawbridge — relay chat messages to a command-line AI agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.clawbridge/config.toml)
    #[arg(short, long, global = true, env = "CLAWBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bridge
    Serve,

    /// Chat with the agent from the terminal through the same pipeline
    Chat,

    /// Render raw agent output from a file (or stdin) and print the chunks
    Format {
        /// Input file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Override the configured render style (summary | collapsible)
        #[arg(short, long)]
        style: Option<RenderStyle>,

        /// Override the configured per-message limit
        #[arg(short, long)]
        max_len: Option<usize>,
    },

    /// Show effective configuration
    Status,

    /// Diagnose configuration and environment
    Doctor,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve => commands::serve::run(config_path).await?,
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Format {
            file,
            style,
            max_len,
        } => commands::format::run(config_path, file, style, max_len).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Init { force } => commands::init::run(config_path, force).await?,
    }

    Ok(())
}
