//! Motorpool Core - Lease Registry
//!
//! This crate holds the state of a small, fixed pool of cars that clients
//! lease for a bounded time:
//! - Registry: claim, release, busy/free heartbeats, listing
//! - Reclamation: background sweep returning expired leases to the pool
//! - Event bus: snapshot + live updates for any number of subscribers
//! - Shutdown: cancellation shared by the sweep and open event streams

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event_bus;
pub mod registry;
pub mod shutdown;

pub use error::{Error, Result};
pub use event_bus::{EventBus, PoolEvent, Subscription};
pub use registry::{
    Car, CarState, LeaseRegistry, PoolStats, ReclaimReport, RegistryConfig, LEASE_TTL_CEILING,
};
pub use shutdown::{
    shutdown_signal_with_controller, wait_for_shutdown_signal, ShutdownController, ShutdownPhase,
    StreamGuard,
};
