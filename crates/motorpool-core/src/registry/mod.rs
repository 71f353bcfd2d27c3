//! Lease registry - the authoritative state of the car pool.
//!
//! Cars move between `FREE`, `RESERVED` and `BUSY`. A lease exists for a car
//! exactly while it is `RESERVED`:
//!
//! ```text
//! FREE --claim--> RESERVED --release/expiry--> FREE
//!   ^  \                \
//!   |   mark_busy        mark_busy (lease abandoned)
//!   |        \                \
//!   +--mark_free-- BUSY <------+
//! ```

mod config;
mod pool;
mod reclaimer;
mod types;

pub use config::{RegistryConfig, LEASE_TTL_CEILING};
pub use pool::LeaseRegistry;
pub use types::{Car, CarState, PoolStats, ReclaimReport};

#[cfg(test)]
mod tests;
