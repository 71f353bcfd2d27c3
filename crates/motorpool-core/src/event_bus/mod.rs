//! EventBus - fan-out of pool changes to live subscribers.
//!
//! Each subscriber owns a bounded mailbox. Publishing copies the current
//! subscriber set and then delivers outside any lock with `try_send`, so a
//! full mailbox costs that subscriber one event and nothing more.

/// Bounded-mailbox bus and subscription handles.
pub mod bus;
/// Event payloads.
pub mod types;

pub use bus::{EventBus, Subscription, DEFAULT_SUBSCRIBER_BUFFER};
pub use types::PoolEvent;

#[cfg(test)]
mod tests;
