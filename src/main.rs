//! SketchSync 실시간 캔버스 중계 서버

mod broadcast;
mod config;
mod handlers;
mod presence;
mod protocol;
mod registry;
mod server;
mod snapshot;
mod state;

use anyhow::Context;
use config::Config;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let snapshots =
        snapshot::from_config(&config.snapshot).context("failed to set up snapshot gateway")?;
    match &config.snapshot.base_url {
        Some(url) => tracing::info!(url = %url, "Snapshot store configured"),
        None => tracing::warn!("SNAPSHOT_URL not set, late joiners start from a blank canvas"),
    }

    let state = Arc::new(AppState::new(config.clone(), snapshots));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("SketchSync relay started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    server::serve(listener, state, shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("SketchSync relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
