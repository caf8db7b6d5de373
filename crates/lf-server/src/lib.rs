//! lf-server: upload gateway, job status API, and the running service.
//!
//! This crate ties the other lf-* crates into a process:
//!
//! - Axum HTTP API: `POST /upload`, job status, lifecycle events, and static
//!   serving of finished artifacts
//! - The bounded worker pool draining the in-process queue
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use lf_av::{FfmpegTranscoder, FfprobeProber, ToolRegistry};
use lf_core::config::{Config, StorageConfig};

use crate::context::AppContext;

/// Start the ladderforge service.
///
/// Creates the storage directories, discovers ffmpeg/ffprobe, spawns the
/// worker pool, and serves HTTP until a shutdown signal arrives. In-flight
/// jobs finish before this returns.
pub async fn start(config: Config) -> lf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }
    config.check()?;

    ensure_storage_dirs(&config.storage)?;

    let tools = Arc::new(discover_tools(&config));
    let prober = Arc::new(FfprobeProber::from_registry(&tools)?);
    let transcoder = Arc::new(FfmpegTranscoder::from_registry(
        &tools,
        config.transcode.clone(),
    )?);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| lf_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(config, tools);
    let cancel = ctx.shutdown.clone();

    let pool = ctx.worker_pool(prober, transcoder);
    let pool_handle = tokio::spawn(pool.run(cancel.clone()));

    let app = router::build_router(ctx);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| lf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting server on {addr}");

    let served = serve(listener, app, cancel.clone()).await;

    // Wait for in-flight jobs; the workers stopped dequeuing at the signal.
    cancel.cancel();
    if let Err(e) = pool_handle.await {
        tracing::error!("Worker pool task failed: {e}");
    }

    served.map_err(|e| lf_core::Error::Internal(format!("Server error: {e}")))?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve `app` until a shutdown signal or `cancel` fires.
///
/// `cancel` is fired as soon as the signal arrives, before open connections
/// drain, so workers stop dequeuing and event streams close.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let signal = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(signal.clone()).await;
            signal.cancel();
        })
        .await
}

/// Create the upload and output directories if missing.
pub fn ensure_storage_dirs(storage: &StorageConfig) -> lf_core::Result<()> {
    for dir in [&storage.upload_dir, &storage.output_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| lf_core::Error::storage(dir, e))?;
            tracing::info!("Created directory {}", dir.display());
        }
    }
    Ok(())
}

/// Discover external tools and log what was found.
pub fn discover_tools(config: &Config) -> ToolRegistry {
    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }
    tools
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
