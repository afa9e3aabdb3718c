pub mod router;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::error::{Result, UpdateError};
use crate::fetch::HttpFetcher;
use crate::patch::PatchEngine;
use crate::release::{GithubReleaseSource, Poller, ReleaseCatalog};
use crate::resolver::UpdateResolver;
use crate::signing::Signer;

/// Start the update server with the given configuration.
///
/// Runs one catalog refresh before accepting traffic, spawns the
/// background poller, and serves until ctrl-c. Shutdown stops the poller
/// before returning so no poll cycle outlives the process.
pub async fn start(config: ServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.asset_dir)?;
    std::fs::create_dir_all(&config.patch_dir)?;

    let signer = Arc::new(Signer::from_pem_file(&config.private_key)?);
    let source = Arc::new(GithubReleaseSource::new(
        &config.feed_owner,
        &config.feed_repo,
    )?);
    let fetcher = Arc::new(HttpFetcher::new(config.asset_dir.clone())?);
    let catalog = Arc::new(ReleaseCatalog::new(source, fetcher, signer));

    tracing::info!(
        owner = %config.feed_owner,
        repo = %config.feed_repo,
        "running initial catalog refresh"
    );
    if let Err(err) = catalog.refresh().await {
        tracing::warn!(%err, "initial catalog refresh failed, starting with an empty catalog");
    }

    let patcher = Arc::new(PatchEngine::new(config.patch_dir.clone()));
    let resolver = Arc::new(UpdateResolver::new(catalog.clone(), patcher));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = Poller::new(
        catalog,
        Duration::from_secs(config.poll_interval_secs),
        shutdown_rx,
    );
    let poller_handle = tokio::spawn(poller.run());

    let bind_addr = config.bind_address();
    let patch_dir = config.patch_dir.clone();
    let app_state = state::AppState::new(resolver, Arc::new(config));
    let app = router::build(app_state, &patch_dir);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| UpdateError::Server(format!("failed to bind to {bind_addr}: {e}")))?;

    tracing::info!("server listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| UpdateError::Server(format!("server error: {e}")))?;

    let _ = shutdown_tx.send(true);
    let _ = poller_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for shutdown signal");
        return std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
