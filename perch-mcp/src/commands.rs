//! Commands module
//!
//! Defines the CLI subcommands and their handlers.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use perch_client::{ClientConfig, TokenBucket, WoodpeckerClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::resolver::RepoResolver;
use crate::server::Server;
use crate::tools::{Dispatcher, catalog};

/// Top-level CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Serve tools over stdio (default)
    Serve,
    /// Check the connection and credentials
    Test,
    /// Print the tool catalog
    Tools,
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Serve => serve(config).await,
        Commands::Test => test_connection(config).await,
        Commands::Tools => {
            print!("{}", catalog_listing());
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> Result<WoodpeckerClient> {
    config.validate().context("Invalid configuration")?;

    let limiter = TokenBucket::default();
    debug!(rate = %limiter.rate(), burst = %limiter.burst(), "Admission limits");

    let client = WoodpeckerClient::connect(
        ClientConfig::new(&config.url, &config.token),
        Arc::new(limiter),
    )
    .await?;
    Ok(client)
}

/// Run the stdio server until stdin closes
async fn serve(config: &Config) -> Result<()> {
    info!(url = %config.url, token = %config.masked_token(), "Starting Perch MCP server");

    let client = connect(config).await?;
    let dispatcher = Dispatcher::new(Arc::new(client), RepoResolver::git());

    Server::new(dispatcher)
        .serve(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}

/// Check the credentials and report the user and visible repository count
async fn test_connection(config: &Config) -> Result<()> {
    println!("{}", "Testing Woodpecker connection".bold());

    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            println!("{} {:#}", "✗ Connection failed:".red().bold(), e);
            return Err(e);
        }
    };

    let cancel = CancellationToken::new();
    let user = client
        .current_user(&cancel)
        .await
        .context("Failed to get user info")?;
    let repos = client
        .list_repositories(&cancel)
        .await
        .context("Failed to list repositories")?;

    println!("{}", "✓ Connection successful!".green().bold());
    println!("  Server:       {}", client.base_url().cyan());
    println!("  Token:        {}", config.masked_token().dimmed());
    println!("  User:         {}", user.login.bold());
    println!("  Repositories: {}", repos.len().to_string().cyan());

    Ok(())
}

/// Human-readable listing of every tool and its parameters
fn catalog_listing() -> String {
    let mut out = String::new();

    for tool in catalog() {
        out.push_str(&format!("{}\n", tool.name.cyan().bold()));
        out.push_str(&format!("  {}\n", tool.description));
        for param in &tool.params {
            let required = if param.required { "*" } else { "" };
            out.push_str(&format!(
                "    - {}{}: {} {}\n",
                param.name,
                required.red(),
                param.kind.as_str().dimmed(),
                format!("({})", param.description).dimmed()
            ));
        }
    }

    out
}
