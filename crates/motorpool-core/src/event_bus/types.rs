use serde::{Deserialize, Serialize};

use crate::registry::Car;

/// Notification delivered to subscribers.
///
/// Serializes as `{"type": "snapshot", "data": [...]}` or
/// `{"type": "update", "data": {...}}`. Payloads are copies; nothing here
/// aliases registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PoolEvent {
    /// Full pool listing, sent once when a subscription starts
    Snapshot(Vec<Car>),
    /// One car changed state
    Update(Car),
}

impl PoolEvent {
    /// Event kind as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::Update(_) => "update",
        }
    }

    /// The changed car, for `update` events.
    #[must_use]
    pub fn car(&self) -> Option<&Car> {
        match self {
            Self::Update(car) => Some(car),
            Self::Snapshot(_) => None,
        }
    }
}
