//! Statekeeper - in-memory state services with periodic snapshots
//!
//! Composition root: builds the stores, restores their snapshots, starts the
//! background tasks and serves the cache, limits and metrics APIs on their
//! own ports.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statekeeper::api::{cache_router, limits_router, metrics_router};
use statekeeper::{spawn_cleanup_task, AppState, Config, SnapshotManager};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the stores
/// 4. Restore snapshots and start the snapshot loops
/// 5. Start background TTL cleanup task
/// 6. Bind and serve the three routers
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statekeeper=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting statekeeper");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_max_entries={}, cache_ttl={}s, snapshot_interval={}s, cleanup_interval={}s",
        config.cache_max_entries,
        config.cache_ttl,
        config.snapshot_interval,
        config.cleanup_interval
    );

    let state = AppState::from_config(&config);

    // Snapshots are restored before any listener is bound
    let mut background = vec![
        SnapshotManager::new(
            "limits",
            state.limits.clone(),
            &config.limits_snapshot_path,
            config.snapshot_period(),
        )
        .start()
        .await,
        SnapshotManager::new(
            "metrics",
            state.metrics.clone(),
            &config.metrics_snapshot_path,
            config.snapshot_period(),
        )
        .start()
        .await,
    ];
    match &config.cache_snapshot_path {
        Some(path) => background.push(
            SnapshotManager::new("cache", state.cache.clone(), path, config.snapshot_period())
                .start()
                .await,
        ),
        None => info!("CACHE_SNAPSHOT_PATH not set, cache contents will not survive restarts"),
    }

    background.push(spawn_cleanup_task(state.cache.clone(), config.cleanup_period()));
    info!("Background tasks started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let services = [
        ("cache", config.cache_port, cache_router(state.clone())),
        ("limits", config.limits_port, limits_router(state.clone())),
        ("metrics", config.metrics_port, metrics_router(state)),
    ];

    let mut servers = Vec::with_capacity(services.len());
    for (service, port, app) in services {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {} service to {}", service, addr))?;
        info!("{} service listening on http://{}", service, addr);

        let mut stop = shutdown_rx.clone();
        servers.push(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopping| *stopping).await;
                })
                .await
        }));
    }

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    for server in servers {
        server.await?.context("server terminated with an error")?;
    }

    // No final snapshot: the last periodic write is what survives
    for task in background {
        task.abort();
    }
    warn!("Background tasks aborted");

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
