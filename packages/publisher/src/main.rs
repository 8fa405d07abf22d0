use std::net::SocketAddr;

use anyhow::Context;
use publisher::config::AppConfig;
use publisher::ledger::fail_interrupted_builds;
use publisher::state::AppState;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = publisher::database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    publisher::seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;

    let store = publisher::storage::init_object_store(&config.storage).await?;

    fail_interrupted_builds(&db)
        .await
        .context("Failed to recover interrupted builds")?;

    let shutdown = CancellationToken::new();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host/server.port")?;

    let state = AppState::new(db, store, config, shutdown.clone());
    let app = publisher::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
