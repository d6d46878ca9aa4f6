use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use toolbridge_mcp::tools::{EchoTool, FileRoot, ListFilesTool, ReadFileTool};
use toolbridge_mcp::{ExitReason, McpServer, ToolRegistry};

mod config;

const DEFAULT_LOG_FILTER: &str = "toolbridge_server=info,toolbridge_mcp=info";

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "toolbridge")]
#[command(about = "Tool-invocation protocol server over stdio", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "toolbridge.toml")]
    config: PathBuf,

    /// Directory the file tools may read from
    #[arg(short, long, env = "TOOLBRIDGE_ROOT")]
    root_dir: Option<PathBuf>,

    /// Per-call handler timeout in seconds (0 disables)
    #[arg(long)]
    call_timeout: Option<u64>,

    /// Log filter, e.g. "debug" or "toolbridge_mcp=trace"
    #[arg(long)]
    log_level: Option<String>,
}

/// Assemble the registry from configuration. Duplicate names fail here,
/// before any frame is read.
fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool))?;

    if config.tools.enable_files {
        let root = FileRoot::new(&config.tools.root_dir);
        registry.register(Arc::new(ListFilesTool::new(root.clone())))?;
        registry.register(Arc::new(ReadFileTool::new(root)))?;
    }

    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries protocol frames, so logs go to stderr
    let filter = match &args.log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let mut config = Config::load(&args.config)?;
    if let Some(root_dir) = args.root_dir {
        config.tools.root_dir = root_dir;
    }
    if let Some(secs) = args.call_timeout {
        config.server.call_timeout_secs = secs;
    }

    let registry = build_registry(&config).context("Failed to register tools")?;
    tracing::info!("Registered {} tools", registry.len());

    let mut server = McpServer::new(registry)
        .with_info(config.server_info())
        .with_protocol_version(config.server.protocol_version.clone())
        .with_call_timeout(config.call_timeout())
        .with_max_frame_bytes(config.server.max_frame_bytes);

    match server.start().await? {
        ExitReason::EndOfInput => tracing::info!("End of input"),
        ExitReason::Shutdown => tracing::info!("Shut down by client"),
    }

    // Dropping the runtime would wait on the stdin reader and on any timed-out
    // blocking handler still running, so exit directly.
    std::process::exit(0)
}
