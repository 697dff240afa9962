//! Novu hub server
//!
//! Main entry point.

use anyhow::{Context as _, Result};
use clap::Parser;
use novu_config::HubConfig;
use novu_server::{cors_layer, create_router, start_server, AppState, Hub};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "novu-hub", version, about = "Meter billing hub")]
struct Args {
    /// Configuration directory holding configuration.yaml and secrets.yaml
    #[arg(short, long, env = "NOVU_CONFIG_DIR", default_value = "config")]
    config: PathBuf,

    /// Listen address, overriding the http section
    #[arg(short, long, env = "NOVU_BIND")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();
    info!(config_dir = %args.config.display(), "Starting Novu hub");

    let config = HubConfig::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    let hub = Hub::start(&config).await?;

    let addr = args.bind.unwrap_or_else(|| hub.http.bind_addr());
    let router = create_router(
        AppState::from_hub(&hub),
        cors_layer(&hub.http.cors_allowed_origins),
    );

    start_server(router, addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutting down...");
    })
    .await
    .with_context(|| format!("API server on {addr} failed"))?;

    hub.stop();
    Ok(())
}
