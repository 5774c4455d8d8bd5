//! Workspace MCP Server - file, system, crypto and email tools for AI assistants.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use workspace_agent_mcp::{
    CapabilityGroup, ServerSelection, WorkspaceConfig, WorkspaceMcpServer,
};

/// Workspace MCP Server - personal workspace capabilities over MCP.
#[derive(Parser, Debug)]
#[command(name = "workspace-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capability group to serve.
    #[arg(long, value_enum, default_value = "all")]
    server: ServerSelection,

    /// TOML config file.
    #[arg(long, env = "WORKSPACE_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON.
    #[arg(long, default_value = "false")]
    json_logs: bool,

    /// Print the tools of the selected server and exit.
    #[arg(long, default_value = "false")]
    list_tools: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the protocol, so logs go to stderr
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = WorkspaceConfig::load(args.config.as_deref())?;
    let mut server = WorkspaceMcpServer::from_config(args.server, &config)?;

    if args.list_tools {
        for definition in server.registry().definitions() {
            println!("{:<28} {}", definition.name, definition.description);
        }
        return Ok(());
    }

    info!("Workspace MCP Server starting");
    info!(
        "Serving {:?}: {} tools",
        args.server,
        server.registry().names().len()
    );
    let serves_email = server.registry().groups().contains(&CapabilityGroup::Email);
    if serves_email && config.email.credentials().is_none() {
        warn!("Email credentials not set; email tools will report an error");
    }

    server.run_stdio().await?;

    Ok(())
}
