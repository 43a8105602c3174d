//! openclaw-bridge entry point.
//!
//! Runs the bridge against an in-memory host until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use openclaw_bridge::bridge::Bridge;
use openclaw_bridge::config::{BridgeConfig, host_descriptor_from_env};
use openclaw_bridge::host::MemoryHost;
use openclaw_bridge::transport::WebSocketConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BridgeConfig::from_env();
    let descriptor = host_descriptor_from_env();
    tracing::info!(
        address = %config.server_address,
        world = %descriptor.world,
        system = %descriptor.system,
        "starting openclaw-bridge"
    );

    let host = Arc::new(MemoryHost::new(descriptor));
    let bridge = Bridge::init(host, WebSocketConnector::new(), config)
        .await
        .context("failed to initialize bridge")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    bridge.shutdown().await;
    Ok(())
}
