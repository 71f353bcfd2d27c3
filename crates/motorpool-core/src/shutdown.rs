//! Graceful shutdown
//!
//! One [`ShutdownController`] per process. The reclamation loop and every
//! long-lived event stream hold a child token; cancelling the controller ends
//! them so the HTTP server can finish draining.
//!
//! ```ignore
//! let shutdown = ShutdownController::new();
//! let registry = LeaseRegistry::new(config)?.with_cancellation(shutdown.token());
//!
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(shutdown_signal_with_controller(shutdown.clone()))
//!     .await?;
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time allowed for open streams to close
const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 10;

/// Shutdown phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Normal operation
    Running,
    /// Tokens cancelled, waiting for open streams to close
    Draining,
    /// Shutdown complete
    Terminated,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Draining => write!(f, "Draining"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Shutdown controller for coordinating graceful shutdown
#[derive(Debug)]
pub struct ShutdownController {
    cancel_token: CancellationToken,
    phase: AtomicU32,
    shutdown_initiated: AtomicBool,
    open_streams: AtomicU32,
    timeout: Duration,
}

impl ShutdownController {
    /// Create a new shutdown controller with default drain timeout
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS))
    }

    /// Create a new shutdown controller with custom drain timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            cancel_token: CancellationToken::new(),
            phase: AtomicU32::new(ShutdownPhase::Running as u32),
            shutdown_initiated: AtomicBool::new(false),
            open_streams: AtomicU32::new(0),
            timeout,
        })
    }

    /// Get a cancellation token for a component
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Get current shutdown phase
    #[must_use]
    pub fn phase(&self) -> ShutdownPhase {
        match self.phase.load(Ordering::SeqCst) {
            0 => ShutdownPhase::Running,
            1 => ShutdownPhase::Draining,
            _ => ShutdownPhase::Terminated,
        }
    }

    /// Check if shutdown has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Register an open event stream. The count drops when the guard does.
    pub fn register_stream(self: &Arc<Self>) -> StreamGuard {
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        StreamGuard {
            controller: Arc::clone(self),
        }
    }

    /// Number of open event streams
    #[must_use]
    pub fn open_stream_count(&self) -> u32 {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: ShutdownPhase) {
        self.phase.store(phase as u32, Ordering::SeqCst);
        info!(phase = %phase, "Shutdown phase changed");
    }

    /// Cancel every token and wait (up to the timeout) for open streams to
    /// close. Only the first call does anything.
    pub async fn shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Shutdown already initiated");
            return;
        }

        info!("Initiating graceful shutdown...");
        self.set_phase(ShutdownPhase::Draining);
        self.cancel_token.cancel();

        let drain_start = tokio::time::Instant::now();
        let check_interval = Duration::from_millis(50);
        loop {
            let open = self.open_stream_count();
            if open == 0 {
                break;
            }
            if drain_start.elapsed() >= self.timeout {
                warn!(
                    open_streams = open,
                    timeout_secs = self.timeout.as_secs(),
                    "Drain timeout exceeded"
                );
                break;
            }
            tokio::time::sleep(check_interval).await;
        }

        self.set_phase(ShutdownPhase::Terminated);
    }
}

/// Guard for an open event stream
#[derive(Debug)]
pub struct StreamGuard {
    controller: Arc<ShutdownController>,
}

impl StreamGuard {
    /// Token cancelled when shutdown begins
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.controller.token()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.controller.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

/// Create a shutdown signal future that integrates with ShutdownController
pub async fn shutdown_signal_with_controller(controller: Arc<ShutdownController>) {
    wait_for_shutdown_signal().await;
    controller.shutdown().await;
}
