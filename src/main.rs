//! long-run-command-mcp - MCP server for long-running shell commands

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use long_run_command_mcp::config::Config;
use long_run_command_mcp::mcp::McpServer;
use long_run_command_mcp::tools::{CommandExecutor, ExecutionPolicy, StreamCapture};

#[derive(Parser, Debug)]
#[command(name = "long-run-command-mcp")]
#[command(about = "MCP server that runs configured shell commands and logs their output to files")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "./config.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// How command output reaches the log files
    #[arg(long, value_enum, default_value_t = StreamCapture::Redirect)]
    capture: StreamCapture,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    let executor = CommandExecutor::new().with_policy(ExecutionPolicy {
        capture: args.capture,
        ..ExecutionPolicy::default()
    });
    let server = Arc::new(McpServer::new(config, executor)?);

    // stdout carries JSON-RPC only; all logging goes elsewhere.
    tokio::select! {
        result = server.serve(tokio::io::stdin(), tokio::io::stdout()) => result?,
        () = shutdown_signal() => {
            tracing::info!("Shutdown signal received, exiting");
        }
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = if args.debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
///
/// Running commands are not killed; they keep writing to their log files.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
