use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lifecycle state of a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarState {
    /// Available for claiming
    Free,
    /// Leased to a holder until the lease expires or is released
    Reserved,
    /// In use, reported by the car itself; no holder tracked
    Busy,
}

impl std::fmt::Display for CarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "FREE"),
            Self::Reserved => write!(f, "RESERVED"),
            Self::Busy => write!(f, "BUSY"),
        }
    }
}

/// Point-in-time copy of one car, as handed to callers and subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    /// Stable car ID (`car-1`, `car-2`, ...)
    pub id: String,
    /// Current state
    pub state: CarState,
    /// Current lease holder; present only while `RESERVED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    /// Time of the last state transition
    pub updated_at: DateTime<Utc>,
    /// Whole seconds left on the lease; present only while `RESERVED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_lease_seconds: Option<u64>,
}

impl Car {
    /// Remaining lease time, zero for cars that are not reserved.
    #[must_use]
    pub fn remaining_lease_secs(&self) -> u64 {
        self.remaining_lease_seconds.unwrap_or(0)
    }
}

/// Counters over the whole pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of cars in the pool
    pub total: usize,
    /// Cars in `FREE`
    pub free: usize,
    /// Cars in `RESERVED`
    pub reserved: usize,
    /// Cars in `BUSY`
    pub busy: usize,
    /// Leases currently tracked
    pub active_leases: usize,
    /// Connected subscribers
    pub subscribers: usize,
    /// Events dropped because a subscriber's buffer was full
    pub dropped_events: u64,
}

/// Outcome of one reclamation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Expired leases whose car went back to `FREE`
    pub reclaimed: usize,
    /// Expired leases discarded because the car had already moved on
    pub stale: usize,
    /// Leases still running after the pass
    pub active: usize,
}

/// Mutable record for one pool slot. Never leaves the registry.
#[derive(Debug)]
pub(crate) struct CarRecord {
    pub id: String,
    pub state: CarState,
    pub holder: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CarRecord {
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: CarState::Free,
            holder: None,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, state: CarState, holder: Option<String>, now: DateTime<Utc>) {
        debug_assert_eq!(state == CarState::Reserved, holder.is_some());
        self.state = state;
        self.holder = holder;
        self.updated_at = now;
    }

    /// Copy out, deriving the remaining lease time from `lease` at `now`.
    pub fn snapshot(&self, lease: Option<&Lease>, now: Instant) -> Car {
        let remaining_lease_seconds = match (self.state, lease) {
            (CarState::Reserved, Some(lease)) => Some(lease.remaining_secs(now)),
            (CarState::Reserved, None) => Some(0),
            _ => None,
        };
        Car {
            id: self.id.clone(),
            state: self.state,
            holder: self.holder.clone(),
            updated_at: self.updated_at,
            remaining_lease_seconds,
        }
    }
}

/// Bookkeeping for one `RESERVED` car.
#[derive(Debug, Clone)]
pub(crate) struct Lease {
    pub holder: String,
    pub expires_at: Instant,
}

impl Lease {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn remaining_secs(&self, now: Instant) -> u64 {
        self.expires_at.saturating_duration_since(now).as_secs()
    }
}
