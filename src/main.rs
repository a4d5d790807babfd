//! Loyalty points backend
//!
//! Wires configuration, storage, the HTTP surface, and the background
//! order processor together, and coordinates graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loyalty_broker::{
    routes, AccrualClient, AppState, Config, OrderProcessor, SqliteStorage, TokenService,
};

/// Fallback signing secret; override with AUTH_SECRET in any real
/// deployment.
const DEFAULT_AUTH_SECRET: &str = "2f9c41d8a07b5e63c4a19d20f8b37e51";

/// Bound on draining HTTP connections and joining the worker.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Loyalty broker starting...");

    if cfg.database_uri.is_empty() {
        bail!("database location is required (-d / DATABASE_URI)");
    }

    let storage = Arc::new(
        SqliteStorage::open(&cfg.database_uri)
            .with_context(|| format!("Failed to open database at {}", cfg.database_uri))?,
    );

    let secret = std::env::var("AUTH_SECRET").unwrap_or_else(|_| DEFAULT_AUTH_SECRET.to_string());
    let tokens = TokenService::new(secret.as_bytes());

    let accrual = Arc::new(
        AccrualClient::new(&cfg.accrual_address).context("Failed to build accrual client")?,
    );

    let state = Arc::new(AppState::new_with_arc(storage.clone(), tokens));
    let app = routes::create_router(state);

    // One watch channel is the process-wide cancellation signal: the
    // server's graceful shutdown and the worker both observe it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = OrderProcessor::new(storage, accrual).spawn(shutdown_rx.clone());

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr()))?;

    tracing::info!(addr = %cfg.listen_addr(), "Server is started");

    let mut server_shutdown = shutdown_rx;
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Bounded drain for in-flight requests, then the worker.
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!("Server did not drain within timeout"),
    }

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, worker).await.is_err() {
        tracing::warn!("Order processor did not stop within timeout");
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for interrupt signal");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
