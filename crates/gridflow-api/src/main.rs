//! GridFlow REST API entry point.
//!
//! Binary name: `gridflow`
//!
//! Parses CLI arguments, loads configuration, wires the engine, and starts
//! the REST API server with graceful shutdown.

mod http;
mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gridflow_infra::config::load_config;
use state::AppState;

#[derive(Parser)]
#[command(name = "gridflow", version, about = "Workflow automation and event dispatch engine")]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory holding config.toml
    #[arg(long, env = "GRIDFLOW_CONFIG_DIR", default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Bind host (overrides config.toml)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config.toml)
        #[arg(long)]
        port: Option<u16>,
        /// Export spans via OpenTelemetry (stdout exporter)
        #[arg(long)]
        otel: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directives = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,gridflow=debug",
        _ => "trace",
    };

    match cli.command {
        Commands::Serve { host, port, otel } => {
            gridflow_observe::tracing_setup::init_tracing(otel, directives)
                .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

            let config = load_config(&cli.config_dir).await;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState::init(config).await?;
            let router = http::router::build_router(state);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "GridFlow API listening");

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("server stopped");
            gridflow_observe::tracing_setup::shutdown_tracing();
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
