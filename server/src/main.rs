//! ChainScan server.
//!
//! Usage:
//!   chainscan --rpc-url https://mainnet.example/rpc --token-address 0xdAC1…1ec7

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chainscan_server::{init_tracing, router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_tracing(&config.log_config());
    config.validate()?;

    let state = Arc::new(AppState::from_config(&config));
    info!(
        endpoints = state.endpoints.len(),
        token = %config.token_address,
        decimals = config.token_decimals,
        "ChainScan starting"
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("ChainScan stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
