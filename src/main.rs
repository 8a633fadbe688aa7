use anyhow::{Result, bail};
use media_ingest::{
    AppState, build_app,
    config::AppConfig,
    services::{
        key_service::KeyGenerator,
        storage_service::{S3ObjectStore, StoreSlot},
    },
};
use std::{io::ErrorKind, sync::Arc};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting media-ingest with config: {:?}", cfg);

    // --- Validate storage configuration once ---
    let store = match cfg.storage.validate() {
        Ok(storage_cfg) => {
            tracing::info!(
                "Object store: bucket `{}` in {}",
                storage_cfg.bucket_name,
                storage_cfg.region
            );
            StoreSlot::Ready(Arc::new(S3ObjectStore::connect(storage_cfg).await))
        }
        Err(err) if cfg.require_storage => {
            bail!("storage configuration incomplete: {}", err);
        }
        Err(err) => {
            tracing::error!("{}; uploads will fail with 500 until fixed", err);
            StoreSlot::Misconfigured(err)
        }
    };

    // --- Build router ---
    let state = AppState::new(store, KeyGenerator::new(cfg.extension_policy));
    let app = build_app(state, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully.");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", err);
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
                tracing::error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, starting graceful shutdown"),
        _ = terminate => tracing::info!("SIGTERM received, starting graceful shutdown"),
    }
}
