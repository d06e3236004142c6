//! Perch
//!
//! Exposes a Woodpecker CI server to agents as MCP tools over stdio.

mod backend;
mod commands;
mod config;
mod protocol;
mod resolver;
mod server;
mod tools;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "perch", version)]
#[command(about = "Woodpecker CI tools for agents over the Model Context Protocol", long_about = None)]
struct Cli {
    /// Woodpecker server URL
    #[arg(long, env = "WOODPECKER_URL", default_value = "")]
    url: String,

    /// Woodpecker personal access token
    #[arg(long, env = "WOODPECKER_TOKEN", default_value = "", hide_env_values = true)]
    token: String,

    /// Log output format (logs always go to stderr)
    #[arg(long, env = "PERCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Initialize logging on stderr; stdout carries protocol frames
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "perch_mcp=info,perch_client=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = Config {
        url: cli.url,
        token: cli.token,
        log_format: cli.log_format,
    };

    handle_command(cli.command.unwrap_or(Commands::Serve), &config).await
}
