//! Configuration validation
//!
//! Rejects settings the server cannot start with and warns about risky ones.

use super::config::AppConfig;
use anyhow::{bail, Result};
use tracing::warn;

/// Validate the merged configuration before anything is started
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.host.trim().is_empty() {
        bail!("server.host must not be empty");
    }
    if config.server.port == 0 {
        bail!("server.port must be non-zero");
    }
    if config.events.keepalive_secs == 0 {
        bail!("events.keepalive_secs must be positive");
    }
    config.registry_config().validate()?;

    if config.server.host == "0.0.0.0" {
        warn!(
            "Server is binding to all interfaces (0.0.0.0). Holder identity is taken from \
             the X-Holder-Id header as-is; put an authenticating proxy in front."
        );
    }
    if config.lease.reclaim_interval_ms > config.lease.default_ttl_secs.saturating_mul(1000) {
        warn!(
            reclaim_interval_ms = config.lease.reclaim_interval_ms,
            default_ttl_secs = config.lease.default_ttl_secs,
            "Reclaim interval is longer than the default lease; expiry will lag noticeably"
        );
    }

    Ok(())
}
