//! Server initialization
//!
//! Builds the registry, starts the reclamation task and serves HTTP until a
//! shutdown signal arrives.

use anyhow::{Context, Result};
use motorpool_core::{shutdown_signal_with_controller, LeaseRegistry, ShutdownController};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::config::AppConfig;
use super::validation::validate_config;
use crate::api::app_router;

/// Time allowed for the reclamation task to stop after shutdown
const RECLAIMER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the server with an already loaded configuration
pub async fn run(config: AppConfig) -> Result<()> {
    info!("Starting Motorpool v{}", env!("CARGO_PKG_VERSION"));

    validate_config(&config)?;

    let shutdown_controller = ShutdownController::new();
    info!("Shutdown controller initialized");

    let registry = Arc::new(
        LeaseRegistry::new(config.registry_config())
            .context("Failed to create lease registry")?
            .with_cancellation(shutdown_controller.token()),
    );
    let reclaimer = registry.spawn_reclaimer();
    info!(
        interval_ms = config.lease.reclaim_interval_ms,
        "Lease reclamation started"
    );

    let app = app_router(
        registry.clone(),
        shutdown_controller.clone(),
        config.events.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    let server_shutdown = shutdown_controller.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_controller(server_shutdown))
        .await
        .context("HTTP server error")?;

    registry.shutdown();
    match tokio::time::timeout(RECLAIMER_STOP_TIMEOUT, reclaimer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Reclamation task error: {}", e),
        Err(_) => warn!("Reclamation task shutdown timeout"),
    }

    info!("Motorpool stopped");
    Ok(())
}
