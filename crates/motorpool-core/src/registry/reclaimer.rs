//! Background expiry sweep.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::pool::LeaseRegistry;

impl LeaseRegistry {
    /// Start the reclamation loop on the current runtime.
    ///
    /// The loop runs one [`reclaim_expired`](Self::reclaim_expired) pass per
    /// `reclaim_interval` and stops when the registry is shut down or
    /// dropped.
    pub fn spawn_reclaimer(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let token = self.cancellation().clone();
        let period = self.config().reclaim_interval;
        tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "Lease reclaimer starting");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !sweep(&registry).await {
                            debug!("Registry dropped, reclaimer exiting");
                            break;
                        }
                    }
                    _ = token.cancelled() => {
                        info!("Lease reclaimer shutting down");
                        break;
                    }
                }
            }
        })
    }
}

/// Run one pass; false once the registry is gone.
async fn sweep(registry: &Weak<LeaseRegistry>) -> bool {
    let Some(registry) = registry.upgrade() else {
        return false;
    };
    let report = registry.reclaim_expired().await;
    if report.reclaimed > 0 || report.stale > 0 {
        info!(
            reclaimed = report.reclaimed,
            stale = report.stale,
            active = report.active,
            "Expired leases reclaimed"
        );
    }
    true
}
