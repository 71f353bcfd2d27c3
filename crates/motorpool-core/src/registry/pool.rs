use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::config::RegistryConfig;
use super::types::{Car, CarRecord, CarState, Lease, PoolStats, ReclaimReport};
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, PoolEvent, Subscription};

/// Authoritative table of cars and their leases.
struct PoolState {
    cars: Vec<CarRecord>,
    index: HashMap<String, usize>,
    leases: HashMap<String, Lease>,
}

impl PoolState {
    fn new(config: &RegistryConfig, now: DateTime<Utc>) -> Self {
        let cars: Vec<CarRecord> = config.car_ids().map(|id| CarRecord::new(id, now)).collect();
        let index = cars
            .iter()
            .enumerate()
            .map(|(i, car)| (car.id.clone(), i))
            .collect();
        Self {
            cars,
            index,
            leases: HashMap::new(),
        }
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.index.get(id).copied().ok_or_else(|| Error::not_found(id))
    }

    fn snapshot(&self, idx: usize, now: Instant) -> Car {
        let record = &self.cars[idx];
        record.snapshot(self.leases.get(&record.id), now)
    }

    fn list(&self, now: Instant) -> Vec<Car> {
        (0..self.cars.len()).map(|i| self.snapshot(i, now)).collect()
    }

    /// Move a car out of any lease into `state` (`FREE` or `BUSY`).
    fn settle(&mut self, idx: usize, state: CarState, clock: &Clock) -> Car {
        let id = self.cars[idx].id.clone();
        self.leases.remove(&id);
        self.cars[idx].transition(state, None, clock.wall);
        self.snapshot(idx, clock.now)
    }
}

/// Both clocks, read once per critical section.
struct Clock {
    now: Instant,
    wall: DateTime<Utc>,
}

impl Clock {
    fn read() -> Self {
        Self {
            now: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Lease registry for a fixed pool of cars.
///
/// All mutation goes through one write lock. Change events are published
/// after that lock is released; a publish gate taken before the release
/// keeps per-car event order equal to transition order.
pub struct LeaseRegistry {
    config: RegistryConfig,
    state: RwLock<PoolState>,
    publish_gate: Mutex<()>,
    bus: EventBus,
    cancel: CancellationToken,
}

impl LeaseRegistry {
    /// Create a registry with every car `FREE`.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let state = PoolState::new(&config, Utc::now());
        let bus = EventBus::new(config.subscriber_buffer);
        info!(
            pool_size = config.pool_size,
            default_ttl_secs = config.default_ttl.as_secs(),
            max_ttl_secs = config.max_ttl.as_secs(),
            "Lease registry created"
        );
        Ok(Self {
            config,
            state: RwLock::new(state),
            publish_gate: Mutex::new(()),
            bus,
            cancel: CancellationToken::new(),
        })
    }

    /// Tie the registry's background work to an external cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Registry configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Event bus carrying this registry's updates.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `mutate` under the write lock, then publish one `update` per
    /// returned car once the lock is gone. Errors publish nothing.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut PoolState, &Clock) -> Result<(T, Vec<Car>)>,
    ) -> Result<T> {
        let mut state = self.state.write().await;
        let clock = Clock::read();
        let (out, changed) = mutate(&mut *state, &clock)?;

        let _gate = self.publish_gate.lock().await;
        drop(state);
        for car in changed {
            self.bus.publish(PoolEvent::Update(car));
        }
        Ok(out)
    }

    /// Consistent copy of every car, in pool order.
    pub async fn list(&self) -> Vec<Car> {
        let state = self.state.read().await;
        state.list(Instant::now())
    }

    /// Copy of one car.
    pub async fn get(&self, car_id: &str) -> Result<Car> {
        let state = self.state.read().await;
        let idx = state.position(car_id)?;
        Ok(state.snapshot(idx, Instant::now()))
    }

    /// Reserve the first free car for `holder`.
    ///
    /// `ttl_secs` outside `(0, max_ttl]` falls back to the default lease.
    pub async fn claim(&self, holder: &str, ttl_secs: Option<i64>) -> Result<Car> {
        if holder.is_empty() {
            return Err(Error::InvalidHolder);
        }
        let ttl = self.config.effective_ttl(ttl_secs);
        let fallback_ttl = self.config.default_ttl;

        let car = self
            .commit(|state, clock| {
                let idx = state
                    .cars
                    .iter()
                    .position(|car| car.state == CarState::Free)
                    .ok_or(Error::ResourceExhausted)?;

                let expires_at = clock
                    .now
                    .checked_add(ttl)
                    .unwrap_or(clock.now + fallback_ttl);

                let record = &mut state.cars[idx];
                record.transition(CarState::Reserved, Some(holder.to_string()), clock.wall);
                state.leases.insert(
                    record.id.clone(),
                    Lease {
                        holder: holder.to_string(),
                        expires_at,
                    },
                );

                let car = state.snapshot(idx, clock.now);
                Ok((car.clone(), vec![car]))
            })
            .await?;

        debug!(car = %car.id, holder, ttl_secs = ttl.as_secs(), "Car claimed");
        Ok(car)
    }

    /// Give back a car leased by `holder`.
    pub async fn release(&self, holder: &str, car_id: &str) -> Result<Car> {
        let car = self
            .commit(|state, clock| {
                let idx = state.position(car_id)?;
                if state.cars[idx].holder.as_deref() != Some(holder) {
                    return Err(Error::NotOwned {
                        id: car_id.to_string(),
                        holder: holder.to_string(),
                    });
                }
                let car = state.settle(idx, CarState::Free, clock);
                Ok((car.clone(), vec![car]))
            })
            .await?;

        debug!(car = %car.id, holder, "Car released");
        Ok(car)
    }

    /// Heartbeat from the car: it is in use. Abandons any lease.
    pub async fn mark_busy(&self, car_id: &str) -> Result<Car> {
        let car = self
            .commit(|state, clock| {
                let idx = state.position(car_id)?;
                if let Some(lease) = state.leases.get(car_id) {
                    debug!(car = car_id, holder = %lease.holder, "Lease abandoned by busy heartbeat");
                }
                let car = state.settle(idx, CarState::Busy, clock);
                Ok((car.clone(), vec![car]))
            })
            .await?;

        debug!(car = %car.id, "Car marked busy");
        Ok(car)
    }

    /// Heartbeat from the car: it is available again.
    pub async fn mark_free(&self, car_id: &str) -> Result<Car> {
        let car = self
            .commit(|state, clock| {
                let idx = state.position(car_id)?;
                let car = state.settle(idx, CarState::Free, clock);
                Ok((car.clone(), vec![car]))
            })
            .await?;

        debug!(car = %car.id, "Car marked free");
        Ok(car)
    }

    /// One expiry sweep over every lease.
    ///
    /// Expired leases whose car is still reserved by the same holder free the
    /// car; any other expired lease is discarded without an event.
    pub async fn reclaim_expired(&self) -> ReclaimReport {
        let result = self
            .commit(|state, clock| {
                let mut report = ReclaimReport::default();
                let expired: Vec<String> = state
                    .leases
                    .iter()
                    .filter(|(_, lease)| lease.is_expired(clock.now))
                    .map(|(id, _)| id.clone())
                    .collect();

                let mut changed = Vec::with_capacity(expired.len());
                for id in expired {
                    let Some(lease) = state.leases.remove(&id) else {
                        continue;
                    };
                    let idx = state.index.get(&id).copied();
                    match idx {
                        Some(idx)
                            if state.cars[idx].state == CarState::Reserved
                                && state.cars[idx].holder.as_deref() == Some(lease.holder.as_str()) =>
                        {
                            changed.push(state.settle(idx, CarState::Free, clock));
                            report.reclaimed += 1;
                            debug!(car = %id, holder = %lease.holder, "Lease expired");
                        }
                        _ => {
                            report.stale += 1;
                            trace!(car = %id, "Discarded stale lease");
                        }
                    }
                }

                for (id, lease) in &state.leases {
                    trace!(car = %id, remaining_secs = lease.remaining_secs(clock.now), "Lease active");
                }
                report.active = state.leases.len();
                Ok((report, changed))
            })
            .await;

        // The sweep closure never fails.
        result.unwrap_or_default()
    }

    /// Subscribe to pool changes.
    ///
    /// The returned subscription already holds a `snapshot` of the pool as
    /// its first event; `update`s for every later change follow. The
    /// snapshot is taken under the shared read lock, so it reflects either
    /// all or none of any concurrent write.
    pub async fn subscribe(&self) -> Subscription {
        let state = self.state.read().await;
        let snapshot = state.list(Instant::now());
        // Registering before the read lock is released means no write can
        // land between the snapshot and the first update.
        self.bus.subscribe_with(PoolEvent::Snapshot(snapshot))
    }

    /// Remove a subscription by ID. Safe to call more than once.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.bus.unsubscribe(subscription.id())
    }

    /// Pool counters.
    pub async fn stats(&self) -> PoolStats {
        let state = self.state.read().await;
        let mut stats = PoolStats {
            total: state.cars.len(),
            active_leases: state.leases.len(),
            subscribers: self.bus.subscriber_count(),
            dropped_events: self.bus.dropped_events(),
            ..PoolStats::default()
        };
        for car in &state.cars {
            match car.state {
                CarState::Free => stats.free += 1,
                CarState::Reserved => stats.reserved += 1,
                CarState::Busy => stats.busy += 1,
            }
        }
        stats
    }

    /// Stop the reclamation task and close every subscription.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.bus.close_all();
        info!("Lease registry shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for LeaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseRegistry")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
impl LeaseRegistry {
    /// Plant a lease that disagrees with the car table.
    pub(super) async fn insert_raw_lease(&self, car_id: &str, holder: &str, ttl: std::time::Duration) {
        let mut state = self.state.write().await;
        state.leases.insert(
            car_id.to_string(),
            Lease {
                holder: holder.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
