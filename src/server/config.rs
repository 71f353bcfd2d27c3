//! Server configuration types
//!
//! Mirrors `config/default.toml`. Every section has serde defaults so a
//! partial override file is enough.

use motorpool_core::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub lease: LeaseConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

impl AppConfig {
    /// Registry settings derived from the `pool`, `lease` and `events` sections.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new()
            .with_pool_size(self.pool.size)
            .with_id_prefix(self.pool.id_prefix.clone())
            .with_default_ttl(Duration::from_secs(self.lease.default_ttl_secs))
            .with_max_ttl(Duration::from_secs(self.lease.max_ttl_secs))
            .with_reclaim_interval(Duration::from_millis(self.lease.reclaim_interval_ms))
            .with_subscriber_buffer(self.events.subscriber_buffer)
    }
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Car pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_size")]
    pub size: usize,
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            id_prefix: default_id_prefix(),
        }
    }
}

fn default_pool_size() -> usize {
    5
}

fn default_id_prefix() -> String {
    "car-".to_string()
}

/// Lease timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseConfig {
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u64,
    #[serde(default = "default_reclaim_interval_ms")]
    pub reclaim_interval_ms: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            max_ttl_secs: default_max_ttl_secs(),
            reclaim_interval_ms: default_reclaim_interval_ms(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    120
}

fn default_max_ttl_secs() -> u64 {
    600
}

fn default_reclaim_interval_ms() -> u64 {
    1000
}

/// Event feed (SSE / WebSocket)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// Interval between SSE keepalive comments
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

fn default_subscriber_buffer() -> usize {
    16
}

fn default_keepalive_secs() -> u64 {
    15
}
