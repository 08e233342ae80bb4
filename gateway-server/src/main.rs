//! Event Source Gateway Server
//!
//! Hosts event source executors behind an HTTP + WebSocket API.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{CliOverrides, ConfigLoader};
use server::GatewayServer;
use shutdown::shutdown_signal;
use state::AppState;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Event Source Gateway - validate and stream external event sources
#[derive(Parser, Debug)]
#[command(name = "gateway-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "GATEWAY_SERVER_PORT")]
    port: Option<u16>,

    /// Override the bind address (e.g., 127.0.0.1)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Path to an optional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    init_tracing(args.log_json);

    tracing::info!("Starting gateway-server v{}", env!("CARGO_PKG_VERSION"));

    let loader = ConfigLoader::new(
        args.config.as_ref(),
        CliOverrides {
            host: args.host,
            port: args.port,
        },
    );
    let config = loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let registry = config.build_registry();
    tracing::info!(
        kinds = ?registry.kinds(),
        shutdown_grace = ?config.adapter.shutdown_grace,
        "Registered executors"
    );

    let server = GatewayServer::bind(config.listen, AppState::new(registry))
        .await
        .map_err(|e| {
            tracing::error!("Failed to start server: {}", e);
            e
        })?;
    server.serve(shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lapin=warn,amq_protocol=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
