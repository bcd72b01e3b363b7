//! filestore server
//!
//! Main entry point that wires the crates together and starts the server.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use filestore_api::{AppState, build_router};
use filestore_core::config::AppConfig;
use filestore_core::AppResult;
use filestore_core::error::AppError;
use filestore_realtime::Hub;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> AppResult<AppConfig> {
    let env = std::env::var("FILESTORE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting filestore v{}", env!("CARGO_PKG_VERSION"));

    let hub = Hub::new(config.realtime.clone());
    let hub_loop = hub
        .start()
        .map_err(|e| AppError::internal(format!("Failed to start hub: {}", e)))?;

    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_router(AppState::new(config, hub.clone()));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("filestore server listening on {}", addr);

    // Stopping the hub closes every WebSocket session, which lets the
    // server finish draining. The grace period starts once shutdown begins.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_hub = hub.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
        shutdown_hub.stop().await;
    });

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = drain_deadline(shutdown_rx, grace) => {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "Grace period elapsed; dropping remaining connections"
            );
        }
    }

    hub.stop().await;
    if tokio::time::timeout(grace, hub_loop).await.is_err() {
        tracing::warn!("Hub control loop did not exit within the grace period");
    }

    tracing::info!("filestore server shut down gracefully");
    Ok(())
}

/// Resolves `grace` after shutdown has started. Never resolves if the
/// server stops without a shutdown signal.
async fn drain_deadline(mut started: watch::Receiver<bool>, grace: Duration) {
    if started.wait_for(|started| *started).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_drain_deadline_counts_from_shutdown() {
        let (tx, rx) = watch::channel(false);
        let deadline = tokio::spawn(drain_deadline(rx, Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!deadline.is_finished(), "no deadline before shutdown starts");

        tx.send(true).expect("receiver alive");
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(!deadline.is_finished());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(deadline.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_deadline_waits_forever_without_shutdown() {
        let (tx, rx) = watch::channel(false);
        let deadline = tokio::spawn(drain_deadline(rx, Duration::from_secs(1)));
        drop(tx);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!deadline.is_finished());
    }
}
