//! Gmail Send MCP Server
//!
//! A Model Context Protocol (MCP) server for sending email through the
//! Gmail API, rate limited to protect the account.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use gmail_send_mcp::config::Config;
use gmail_send_mcp::error::Result;
use gmail_send_mcp::gmail::auth::Authenticator;
use gmail_send_mcp::gmail::client::GmailClient;
use gmail_send_mcp::mcp::server::McpServer;
use gmail_send_mcp::ratelimit::RateLimiter;

/// Gmail Send MCP Server
#[derive(Parser)]
#[command(name = "gmail-send-mcp")]
#[command(author, version, about = "Gmail Send MCP Server - rate-limited email sending over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with Gmail (run this first)
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr; stdout carries the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::new()?;

    match cli.command {
        Some(Commands::Auth) => {
            let authenticator = Authenticator::new(config).await?;
            authenticator.authenticate_interactive().await?;
            eprintln!("Authentication completed successfully!");
            std::process::exit(0);
        }
        None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    if !config.oauth_keys_exist() {
        eprintln!("Error: OAuth keys file not found.");
        eprintln!(
            "Please place gcp-oauth.keys.json in current directory or {}",
            config.config_dir.display()
        );
        std::process::exit(1);
    }

    let send_limits = config.send_limits;

    let authenticator = Authenticator::new(config).await?;

    if !authenticator.is_authenticated().await {
        eprintln!("Error: Not authenticated. Please run 'gmail-send-mcp auth' first.");
        std::process::exit(1);
    }

    let gmail_client = Arc::new(GmailClient::new(Arc::new(authenticator)));

    tracing::info!(
        "Starting MCP server with send limits: {}/hour, {}/day",
        send_limits.max_per_hour,
        send_limits.max_per_day
    );

    let mut server = McpServer::new(gmail_client, RateLimiter::new(send_limits));
    server.run_stdio().await?;

    Ok(())
}
