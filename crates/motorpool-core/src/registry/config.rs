use std::time::Duration;

use crate::error::{Error, Result};
use crate::event_bus::DEFAULT_SUBSCRIBER_BUFFER;

/// Upper bound accepted for `max_ttl`
pub const LEASE_TTL_CEILING: Duration = Duration::from_secs(24 * 60 * 60);

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of cars in the pool
    pub pool_size: usize,
    /// Prefix for generated car IDs (`{prefix}{n}`, n starting at 1)
    pub id_prefix: String,
    /// Lease duration used when the requested one is missing or out of range
    pub default_ttl: Duration,
    /// Longest lease a caller may request
    pub max_ttl: Duration,
    /// Period of the expiry sweep
    pub reclaim_interval: Duration,
    /// Events buffered per subscriber before drops start
    pub subscriber_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            id_prefix: "car-".to_string(),
            default_ttl: Duration::from_secs(120),
            max_ttl: Duration::from_secs(600),
            reclaim_interval: Duration::from_secs(1),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl RegistryConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pool size
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set car ID prefix
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Set default lease duration
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set maximum lease duration
    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    /// Set reclamation period
    pub fn with_reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval = interval;
        self
    }

    /// Set per-subscriber buffer size
    pub fn with_subscriber_buffer(mut self, buffer: usize) -> Self {
        self.subscriber_buffer = buffer;
        self
    }

    /// Check the configuration for values the registry cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::invalid_config("pool.size", "must be at least 1"));
        }
        if self.id_prefix.is_empty() {
            return Err(Error::invalid_config("pool.id_prefix", "must not be empty"));
        }
        if self.default_ttl.is_zero() {
            return Err(Error::invalid_config(
                "lease.default_ttl_secs",
                "must be positive",
            ));
        }
        if self.default_ttl > self.max_ttl {
            return Err(Error::invalid_config(
                "lease.default_ttl_secs",
                format!(
                    "{}s exceeds lease.max_ttl_secs ({}s)",
                    self.default_ttl.as_secs(),
                    self.max_ttl.as_secs()
                ),
            ));
        }
        if self.max_ttl > LEASE_TTL_CEILING {
            return Err(Error::invalid_config(
                "lease.max_ttl_secs",
                format!(
                    "{}s exceeds the {}s ceiling",
                    self.max_ttl.as_secs(),
                    LEASE_TTL_CEILING.as_secs()
                ),
            ));
        }
        if self.reclaim_interval.is_zero() {
            return Err(Error::invalid_config(
                "lease.reclaim_interval_ms",
                "must be positive",
            ));
        }
        if self.subscriber_buffer == 0 {
            return Err(Error::invalid_config(
                "events.subscriber_buffer",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Lease duration for a claim that asked for `requested_secs`.
    ///
    /// Missing, zero, negative, and over-limit requests get `default_ttl`.
    /// Exactly `max_ttl` is allowed.
    #[must_use]
    pub fn effective_ttl(&self, requested_secs: Option<i64>) -> Duration {
        match requested_secs {
            Some(secs) if secs > 0 => {
                let requested = Duration::from_secs(secs.unsigned_abs());
                if requested <= self.max_ttl {
                    requested
                } else {
                    self.default_ttl
                }
            }
            _ => self.default_ttl,
        }
    }

    /// Car IDs in pool order.
    pub fn car_ids(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.pool_size).map(move |n| format!("{}{}", self.id_prefix, n))
    }
}
