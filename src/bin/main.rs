//! Service entry point: wires configuration, the engine, the store and the
//! HTTP/WebSocket surface together, then serves until shutdown.

use std::sync::Arc;

use clob_engine::api::{router, AppState};
use clob_engine::config::Config;
use clob_engine::engine::Engine;
use clob_engine::repository::{JournaledRepository, Repository};
use clob_engine::snapshot::SnapshotService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(bind_addr = %config.bind_addr, journal_dir = %config.journal_dir.display(), "starting engine service");

    std::fs::create_dir_all(&config.journal_dir)?;
    let journal_path = config.journal_dir.join("orders.journal");
    let repo: Arc<dyn Repository> = Arc::new(JournaledRepository::open(&journal_path)?);

    let engine = Engine::spawn(Arc::clone(&repo), config.channel_capacity);
    let snapshot = Arc::new(SnapshotService::new(repo, config.default_snapshot_depth, 5));

    let push_service = Arc::clone(&snapshot);
    let push_interval = config.push_interval;
    tokio::spawn(async move { push_service.run_push_loop(push_interval).await });

    let app = router(AppState { engine, snapshot });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
