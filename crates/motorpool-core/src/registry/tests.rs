use super::*;
use crate::error::Error;
use crate::event_bus::PoolEvent;
use std::sync::Arc;
use std::time::Duration;

fn registry(size: usize) -> LeaseRegistry {
    LeaseRegistry::new(RegistryConfig::new().with_pool_size(size)).unwrap()
}

async fn assert_lease_invariant(registry: &LeaseRegistry) {
    let stats = registry.stats().await;
    assert_eq!(stats.reserved, stats.active_leases);
    for car in registry.list().await {
        assert_eq!(car.state == CarState::Reserved, car.holder.is_some());
    }
}

#[tokio::test]
async fn test_pool_starts_free() {
    let registry = registry(3);
    let cars = registry.list().await;

    let ids: Vec<&str> = cars.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["car-1", "car-2", "car-3"]);
    assert!(cars.iter().all(|c| c.state == CarState::Free));
    assert!(cars.iter().all(|c| c.holder.is_none()));
    assert!(cars.iter().all(|c| c.remaining_lease_secs() == 0));
}

#[tokio::test(start_paused = true)]
async fn test_claim_release_scenario() {
    let registry = registry(2);

    let car = registry.claim("alice", Some(60)).await.unwrap();
    assert_eq!(car.id, "car-1");
    assert_eq!(car.state, CarState::Reserved);
    assert_eq!(car.holder.as_deref(), Some("alice"));
    assert_eq!(car.remaining_lease_seconds, Some(60));

    let car = registry.claim("bob", Some(60)).await.unwrap();
    assert_eq!(car.id, "car-2");

    let err = registry.claim("carol", Some(60)).await.unwrap_err();
    assert_eq!(err, Error::ResourceExhausted);

    let car = registry.release("alice", "car-1").await.unwrap();
    assert_eq!(car.id, "car-1");
    assert_eq!(car.state, CarState::Free);
    assert!(car.holder.is_none());

    let car = registry.claim("carol", Some(60)).await.unwrap();
    assert_eq!(car.id, "car-1");
    assert_eq!(car.holder.as_deref(), Some("carol"));

    assert_lease_invariant(&registry).await;
}

#[tokio::test]
async fn test_exhausted_claim_changes_nothing() {
    let registry = registry(1);
    registry.claim("alice", None).await.unwrap();
    let before = registry.list().await;
    let mut sub = registry.subscribe().await;
    sub.recv().await.unwrap(); // snapshot

    assert_eq!(
        registry.claim("bob", None).await.unwrap_err(),
        Error::ResourceExhausted
    );
    assert_eq!(registry.list().await[0].holder, before[0].holder);
    assert_eq!(registry.list().await[0].updated_at, before[0].updated_at);
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn test_claim_rejects_empty_holder() {
    let registry = registry(1);
    assert_eq!(
        registry.claim("", None).await.unwrap_err(),
        Error::InvalidHolder
    );
    assert_eq!(registry.stats().await.free, 1);
}

#[tokio::test]
async fn test_release_by_non_holder() {
    let registry = registry(1);
    registry.claim("alice", Some(60)).await.unwrap();

    let err = registry.release("mallory", "car-1").await.unwrap_err();
    assert_eq!(
        err,
        Error::NotOwned {
            id: "car-1".to_string(),
            holder: "mallory".to_string(),
        }
    );

    let car = registry.get("car-1").await.unwrap();
    assert_eq!(car.state, CarState::Reserved);
    assert_eq!(car.holder.as_deref(), Some("alice"));
    assert_eq!(registry.stats().await.active_leases, 1);
}

#[tokio::test]
async fn test_release_unknown_car() {
    let registry = registry(1);
    assert_eq!(
        registry.release("alice", "car-99").await.unwrap_err(),
        Error::not_found("car-99")
    );
}

#[tokio::test]
async fn test_release_free_car_is_not_owned() {
    let registry = registry(1);
    let err = registry.release("alice", "car-1").await.unwrap_err();
    assert!(matches!(err, Error::NotOwned { .. }));

    tokio_test::assert_ok!(registry.claim("alice", None).await);
    tokio_test::assert_ok!(registry.release("alice", "car-1").await);
    tokio_test::assert_err!(registry.release("alice", "car-1").await);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_clamping() {
    let registry = registry(5);

    let car = registry.claim("a", None).await.unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(120));

    let car = registry.claim("b", Some(0)).await.unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(120));

    let car = registry.claim("c", Some(-5)).await.unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(120));

    let car = registry.claim("d", Some(600)).await.unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(600));

    let car = registry.claim("e", Some(601)).await.unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(120));
}

#[tokio::test]
async fn test_mark_busy_abandons_lease() {
    let registry = registry(2);
    registry.claim("alice", Some(60)).await.unwrap();

    let car = registry.mark_busy("car-1").await.unwrap();
    assert_eq!(car.state, CarState::Busy);
    assert!(car.holder.is_none());
    assert!(car.remaining_lease_seconds.is_none());
    assert_eq!(registry.stats().await.active_leases, 0);

    // The old holder can no longer release it
    assert!(matches!(
        registry.release("alice", "car-1").await.unwrap_err(),
        Error::NotOwned { .. }
    ));

    let car = registry.claim("bob", None).await.unwrap();
    assert_eq!(car.id, "car-2");
    assert_eq!(
        registry.claim("carol", None).await.unwrap_err(),
        Error::ResourceExhausted
    );
    assert_lease_invariant(&registry).await;
}

#[tokio::test]
async fn test_mark_free_returns_car_to_pool() {
    let registry = registry(1);
    registry.mark_busy("car-1").await.unwrap();
    assert_eq!(
        registry.claim("alice", None).await.unwrap_err(),
        Error::ResourceExhausted
    );

    let car = registry.mark_free("car-1").await.unwrap();
    assert_eq!(car.state, CarState::Free);

    let car = registry.claim("alice", None).await.unwrap();
    assert_eq!(car.id, "car-1");
}

#[tokio::test]
async fn test_mark_free_on_reserved_drops_lease() {
    let registry = registry(1);
    registry.claim("alice", None).await.unwrap();
    registry.mark_free("car-1").await.unwrap();

    let stats = registry.stats().await;
    assert_eq!(stats.free, 1);
    assert_eq!(stats.active_leases, 0);
}

#[tokio::test]
async fn test_heartbeats_on_unknown_car() {
    let registry = registry(1);
    assert_eq!(
        registry.mark_busy("nope").await.unwrap_err(),
        Error::not_found("nope")
    );
    assert_eq!(
        registry.mark_free("nope").await.unwrap_err(),
        Error::not_found("nope")
    );
    assert_eq!(registry.get("nope").await.unwrap_err(), Error::not_found("nope"));
}

#[tokio::test(start_paused = true)]
async fn test_remaining_lease_is_derived_at_read_time() {
    let registry = registry(1);
    registry.claim("alice", Some(120)).await.unwrap();

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(registry.get("car-1").await.unwrap().remaining_lease_seconds, Some(90));

    tokio::time::advance(Duration::from_secs(200)).await;
    // Expired but not yet swept
    let car = registry.get("car-1").await.unwrap();
    assert_eq!(car.state, CarState::Reserved);
    assert_eq!(car.remaining_lease_seconds, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_reclaim_expired_lease() {
    let registry = registry(2);
    registry.claim("alice", Some(1)).await.unwrap();
    registry.claim("bob", Some(60)).await.unwrap();
    let mut sub = registry.subscribe().await;
    assert_eq!(sub.recv().await.unwrap().kind(), "snapshot");

    let report = registry.reclaim_expired().await;
    assert_eq!(report, ReclaimReport { reclaimed: 0, stale: 0, active: 2 });

    tokio::time::advance(Duration::from_secs(1)).await;
    let report = registry.reclaim_expired().await;
    assert_eq!(report, ReclaimReport { reclaimed: 1, stale: 0, active: 1 });

    let car = registry.get("car-1").await.unwrap();
    assert_eq!(car.state, CarState::Free);
    assert!(car.holder.is_none());

    match sub.recv().await.unwrap() {
        PoolEvent::Update(car) => {
            assert_eq!(car.id, "car-1");
            assert_eq!(car.state, CarState::Free);
        }
        other => panic!("expected update, got: {:?}", other),
    }
    assert!(sub.try_recv().is_none());

    // A second pass finds nothing new
    let report = registry.reclaim_expired().await;
    assert_eq!(report.reclaimed, 0);
    assert!(sub.try_recv().is_none());
    assert_lease_invariant(&registry).await;
}

#[tokio::test(start_paused = true)]
async fn test_reclaim_discards_stale_lease_silently() {
    let registry = registry(2);
    registry.mark_busy("car-2").await.unwrap();
    registry
        .insert_raw_lease("car-2", "ghost", Duration::from_secs(1))
        .await;
    registry
        .insert_raw_lease("car-404", "ghost", Duration::from_secs(1))
        .await;
    let mut sub = registry.subscribe().await;
    sub.recv().await.unwrap();

    tokio::time::advance(Duration::from_secs(2)).await;
    let report = registry.reclaim_expired().await;
    assert_eq!(report, ReclaimReport { reclaimed: 0, stale: 2, active: 0 });

    assert_eq!(registry.get("car-2").await.unwrap().state, CarState::Busy);
    assert!(sub.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reclaimer_task_frees_within_interval() {
    let registry = Arc::new(registry(1));
    let handle = registry.spawn_reclaimer();

    registry.claim("alice", Some(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let car = registry.list().await.remove(0);
    assert_eq!(car.state, CarState::Free);
    assert!(car.holder.is_none());

    registry.shutdown();
    handle.await.unwrap();
    assert!(registry.is_shut_down());
}

#[tokio::test]
async fn test_subscribe_snapshot_then_updates() {
    let registry = registry(2);
    registry.claim("alice", None).await.unwrap();
    let listed = registry.list().await;

    let mut sub = registry.subscribe().await;
    match sub.recv().await.unwrap() {
        PoolEvent::Snapshot(cars) => assert_eq!(cars, listed),
        other => panic!("expected snapshot, got: {:?}", other),
    }

    registry.mark_busy("car-2").await.unwrap();
    let event = sub.recv().await.unwrap();
    let car = event.car().unwrap();
    assert_eq!(car.id, "car-2");
    assert_eq!(car.state, CarState::Busy);

    assert!(registry.unsubscribe(&sub));
    assert!(!registry.unsubscribe(&sub));
    assert_eq!(registry.stats().await.subscribers, 0);
}

#[tokio::test]
async fn test_shutdown_closes_subscriptions() {
    let registry = registry(1);
    let mut sub = registry.subscribe().await;
    registry.shutdown();

    assert_eq!(sub.recv().await.unwrap().kind(), "snapshot");
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn test_stats() {
    let registry = registry(3);
    registry.claim("alice", None).await.unwrap();
    registry.mark_busy("car-3").await.unwrap();
    let _sub = registry.subscribe().await;

    let stats = registry.stats().await;
    assert_eq!(
        stats,
        PoolStats {
            total: 3,
            free: 1,
            reserved: 1,
            busy: 1,
            active_leases: 1,
            subscribers: 1,
            dropped_events: 0,
        }
    );
}

#[test]
fn test_invalid_config_rejected() {
    let err = LeaseRegistry::new(RegistryConfig::new().with_pool_size(0)).unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");
}

#[test]
fn test_config_validation() {
    assert!(RegistryConfig::default().validate().is_ok());
    assert!(RegistryConfig::new().with_id_prefix("").validate().is_err());
    assert!(RegistryConfig::new()
        .with_default_ttl(Duration::ZERO)
        .validate()
        .is_err());
    assert!(RegistryConfig::new()
        .with_default_ttl(Duration::from_secs(700))
        .validate()
        .is_err());
    assert!(RegistryConfig::new()
        .with_reclaim_interval(Duration::ZERO)
        .validate()
        .is_err());
    assert!(RegistryConfig::new()
        .with_subscriber_buffer(0)
        .validate()
        .is_err());
}

#[test]
fn test_max_ttl_ceiling() {
    assert!(RegistryConfig::new()
        .with_max_ttl(LEASE_TTL_CEILING)
        .validate()
        .is_ok());

    let err = RegistryConfig::new()
        .with_max_ttl(Duration::from_secs(u64::MAX))
        .validate()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { ref field, .. } if field == "lease.max_ttl_secs"));

    let err = LeaseRegistry::new(
        RegistryConfig::new().with_max_ttl(LEASE_TTL_CEILING + Duration::from_secs(1)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");
}

#[tokio::test(start_paused = true)]
async fn test_claim_at_ceiling_does_not_overflow() {
    let registry =
        LeaseRegistry::new(RegistryConfig::new().with_pool_size(2).with_max_ttl(LEASE_TTL_CEILING))
            .unwrap();

    let car = registry
        .claim("alice", Some(LEASE_TTL_CEILING.as_secs() as i64))
        .await
        .unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(LEASE_TTL_CEILING.as_secs()));

    let car = registry.claim("bob", Some(i64::MAX)).await.unwrap();
    assert_eq!(car.remaining_lease_seconds, Some(120));
}

#[test]
fn test_effective_ttl() {
    let config = RegistryConfig::new()
        .with_default_ttl(Duration::from_secs(30))
        .with_max_ttl(Duration::from_secs(90));

    assert_eq!(config.effective_ttl(None), Duration::from_secs(30));
    assert_eq!(config.effective_ttl(Some(0)), Duration::from_secs(30));
    assert_eq!(config.effective_ttl(Some(-1)), Duration::from_secs(30));
    assert_eq!(config.effective_ttl(Some(1)), Duration::from_secs(1));
    assert_eq!(config.effective_ttl(Some(90)), Duration::from_secs(90));
    assert_eq!(config.effective_ttl(Some(91)), Duration::from_secs(30));
}

#[test]
fn test_car_ids_use_prefix() {
    let config = RegistryConfig::new().with_pool_size(2).with_id_prefix("kart-");
    let ids: Vec<String> = config.car_ids().collect();
    assert_eq!(ids, vec!["kart-1", "kart-2"]);
}
