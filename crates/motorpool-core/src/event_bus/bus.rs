use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::PoolEvent;

/// Default per-subscriber buffer
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

struct BusInner {
    subscribers: DashMap<Uuid, mpsc::Sender<PoolEvent>>,
    capacity: usize,
    dropped: AtomicU64,
}

/// Fan-out bus with one bounded mailbox per subscriber.
///
/// Delivery never blocks: when a mailbox is full the event is dropped for
/// that subscriber only, so a slow consumer cannot stall the publisher or
/// anyone else.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.inner.subscribers.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

impl EventBus {
    /// Create a bus whose mailboxes hold `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: DashMap::new(),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new mailbox.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        self.register(tx, rx)
    }

    /// Register a new mailbox with `initial` already queued as its first event.
    #[must_use]
    pub fn subscribe_with(&self, initial: PoolEvent) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        // Fresh channel with capacity >= 1, so this cannot be full.
        let _ = tx.try_send(initial);
        self.register(tx, rx)
    }

    fn register(&self, tx: mpsc::Sender<PoolEvent>, rx: mpsc::Receiver<PoolEvent>) -> Subscription {
        let id = Uuid::new_v4();
        self.inner.subscribers.insert(id, tx);
        debug!(subscription = %id, "Subscriber registered");
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber and close its mailbox. Unknown or already removed
    /// IDs are ignored; returns whether anything was removed.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.inner.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscription = %id, "Subscriber removed");
        }
        removed
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Returns the number of mailboxes that accepted the event.
    pub fn publish(&self, event: PoolEvent) -> usize {
        let targets: Vec<(Uuid, mpsc::Sender<PoolEvent>)> = self
            .inner
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(subscription = %id, kind = event.kind(), "Dropping event for slow subscriber");
                }
                Err(TrySendError::Closed(_)) => {
                    self.inner.subscribers.remove(&id);
                }
            }
        }
        delivered
    }

    /// Close every mailbox. Subscribers drain what is buffered and then end.
    pub fn close_all(&self) {
        let count = self.inner.subscribers.len();
        self.inner.subscribers.clear();
        if count > 0 {
            debug!(count, "Closed all subscriptions");
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Total events dropped on full mailboxes since the bus was created.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Mailbox capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

/// Receiving end of one subscription.
///
/// Dropping the handle unsubscribes it.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<PoolEvent>,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Subscription ID, usable with [`EventBus::unsubscribe`].
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the subscription has been closed and
    /// its buffer drained.
    pub async fn recv(&mut self) -> Option<PoolEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<PoolEvent> {
        self.rx.try_recv().ok()
    }

    /// Convert into a stream of events. The subscription stays registered
    /// until the stream is dropped.
    pub fn into_stream(self) -> impl Stream<Item = PoolEvent> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            if bus.subscribers.remove(&self.id).is_some() {
                debug!(subscription = %self.id, "Subscriber dropped");
            }
        }
    }
}
