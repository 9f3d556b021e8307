//! Quickshare - short-lived text and file sharing server
//!
//! Serves the share API over HTTP, backed by a write-behind persisted cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quickshare::{
    api::create_router,
    blob::FsBlobStore,
    clock::SystemClock,
    config::MAX_ID_SPACE_RATIO,
    persistence::relink_missing_blobs,
    spawn_cleanup_task, AppState, Config, IdAllocator, PersistenceManager, ShareService,
};

/// Main entry point for the Quickshare server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Optionally relink file shares that lost their blob location
/// 4. Open the persistence manager (hydrates cache, starts flush task)
/// 5. Start background cleanup task
/// 6. Create Axum router with all endpoints
/// 7. Start HTTP server on configured port
/// 8. On SIGINT/SIGTERM stop serving, abort cleanup, flush and close storage
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickshare=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quickshare server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, ttl={}h, flush_interval={}s, cleanup_interval={}s, port={}",
        config.max_entries,
        config.ttl_hours,
        config.flush_interval,
        config.cleanup_interval,
        config.server_port
    );
    if config.id_space_ratio() > MAX_ID_SPACE_RATIO {
        warn!(
            ratio = config.id_space_ratio(),
            "MAX_ENTRIES is more than half of the share code space, expect time-derived fallback ids"
        );
    }

    let blobs = Arc::new(FsBlobStore::new(&config.storage_path));

    if config.repair_metadata {
        match relink_missing_blobs(&config.metadata_file, blobs.as_ref(), &SystemClock).await {
            Ok(report) => info!(
                relinked = report.relinked,
                unmatched = report.unmatched,
                "Metadata repair finished"
            ),
            Err(err) => warn!("Metadata repair skipped: {}", err),
        }
    }

    let manager = PersistenceManager::open(config.persistence(), Arc::new(SystemClock))
        .await
        .context("failed to open share metadata storage")?;

    let allocator = IdAllocator::new(manager.clone(), config.id_retries);
    let service = Arc::new(ShareService::new(manager.clone(), allocator, blobs));

    let cleanup_handle = spawn_cleanup_task(service.cleanup_trigger(), config.cleanup_interval);
    info!("Background cleanup task started");

    let app = create_router(AppState::from_config(service, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    manager.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
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

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
