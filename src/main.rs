//! GeoGebra MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server exposing GeoGebra plotting tools
//! over stdio.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use geogebra_mcp_server::config::Config;
use geogebra_mcp_server::geogebra::{BridgeEngine, EngineSession};
use geogebra_mcp_server::mcp::server::McpServer;
use geogebra_mcp_server::mcp::tools::default_registry;
use geogebra_mcp_server::mcp::types::ListToolsResult;

/// GeoGebra MCP Server
#[derive(Parser)]
#[command(name = "geogebra-mcp-server")]
#[command(
    author,
    version,
    about = "GeoGebra MCP Server - A Model Context Protocol server for GeoGebra"
)]
struct Cli {
    /// Base URL of the GeoGebra bridge (overrides config and environment)
    #[arg(long)]
    bridge_url: Option<String>,

    /// Per-request timeout against the bridge, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalogue as JSON and exit
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries protocol traffic, so logs go to stderr
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Tools) => {
            let registry = default_registry().context("failed to build tool registry")?;
            let listing = ListToolsResult {
                tools: registry.list_tools(),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        None => {
            let config = load_config(&cli)?;
            run_server(config).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::new().context("failed to load configuration")?;

    if let Some(url) = &cli.bridge_url {
        config = config.with_bridge_url(url.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout_secs(secs);
    }
    // Validate once, after flags had the chance to fix file or env values
    config.validate().context("invalid configuration")?;

    Ok(config)
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let engine = BridgeEngine::new(&config).context("failed to create bridge client")?;

    if !engine.is_ready().await {
        tracing::warn!(
            "GeoGebra bridge at {} is not ready; tool calls will fail until it is",
            config.bridge_url
        );
    }

    let session: Arc<dyn EngineSession> = Arc::new(engine);
    let mut server = McpServer::new(session).context("failed to start MCP server")?;
    server.run_stdio().await?;

    Ok(())
}
