use super::*;
use crate::registry::{Car, CarState};
use chrono::Utc;
use futures::StreamExt;

fn car(id: &str, state: CarState) -> Car {
    Car {
        id: id.to_string(),
        state,
        holder: None,
        updated_at: Utc::now(),
        remaining_lease_seconds: None,
    }
}

#[tokio::test]
async fn test_publish_subscribe() {
    let bus = EventBus::new(16);
    let mut sub = bus.subscribe();

    let count = bus.publish(PoolEvent::Update(car("car-1", CarState::Busy)));
    assert_eq!(count, 1);

    let event = sub.recv().await.unwrap();
    assert_eq!(event.kind(), "update");
    assert_eq!(event.car().unwrap().id, "car-1");
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let bus = EventBus::new(16);
    let mut sub1 = bus.subscribe();
    let mut sub2 = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    let count = bus.publish(PoolEvent::Update(car("car-2", CarState::Free)));
    assert_eq!(count, 2);

    assert_eq!(sub1.recv().await.unwrap().car().unwrap().id, "car-2");
    assert_eq!(sub2.recv().await.unwrap().car().unwrap().id, "car-2");
}

#[test]
fn test_publish_no_subscribers() {
    let bus = EventBus::default();
    let count = bus.publish(PoolEvent::Update(car("car-1", CarState::Free)));
    assert_eq!(count, 0);
    assert_eq!(bus.capacity(), DEFAULT_SUBSCRIBER_BUFFER);
}

#[tokio::test]
async fn test_initial_event_comes_first() {
    let bus = EventBus::new(4);
    let mut sub = bus.subscribe_with(PoolEvent::Snapshot(vec![car("car-1", CarState::Free)]));
    bus.publish(PoolEvent::Update(car("car-1", CarState::Busy)));

    assert_eq!(sub.recv().await.unwrap().kind(), "snapshot");
    assert_eq!(sub.recv().await.unwrap().kind(), "update");
}

#[tokio::test]
async fn test_full_mailbox_drops_only_for_slow_subscriber() {
    let bus = EventBus::new(2);
    let mut slow = bus.subscribe();
    let mut fast = bus.subscribe();

    for i in 0..2 {
        bus.publish(PoolEvent::Update(car(&format!("car-{i}"), CarState::Busy)));
        fast.recv().await.unwrap();
    }

    // slow's mailbox is now full
    let delivered = bus.publish(PoolEvent::Update(car("car-9", CarState::Free)));
    assert_eq!(delivered, 1);
    assert_eq!(bus.dropped_events(), 1);
    assert_eq!(fast.recv().await.unwrap().car().unwrap().id, "car-9");

    assert_eq!(slow.recv().await.unwrap().car().unwrap().id, "car-0");
    assert_eq!(slow.recv().await.unwrap().car().unwrap().id, "car-1");
    assert!(slow.try_recv().is_none());
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent_and_closes() {
    let bus = EventBus::new(4);
    let mut sub = bus.subscribe();
    let id = sub.id();

    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    assert_eq!(bus.subscriber_count(), 0);

    assert_eq!(bus.publish(PoolEvent::Update(car("car-1", CarState::Free))), 0);
    assert!(sub.recv().await.is_none());
}

#[test]
fn test_drop_unsubscribes() {
    let bus = EventBus::new(4);
    let sub = bus.subscribe();
    let id = sub.id();
    assert_eq!(bus.subscriber_count(), 1);

    drop(sub);
    assert_eq!(bus.subscriber_count(), 0);
    assert!(!bus.unsubscribe(id));
}

#[tokio::test]
async fn test_close_all_ends_streams() {
    let bus = EventBus::new(4);
    let sub = bus.subscribe();
    bus.publish(PoolEvent::Update(car("car-1", CarState::Reserved)));
    bus.close_all();

    let events: Vec<PoolEvent> = sub.into_stream().collect().await;
    assert_eq!(events.len(), 1);
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn test_event_serialization() {
    let mut reserved = car("car-1", CarState::Reserved);
    reserved.holder = Some("alice".to_string());
    reserved.remaining_lease_seconds = Some(60);

    let json = serde_json::to_value(PoolEvent::Update(reserved)).unwrap();
    assert_eq!(json["type"], "update");
    assert_eq!(json["data"]["state"], "RESERVED");
    assert_eq!(json["data"]["holder"], "alice");
    assert_eq!(json["data"]["remainingLeaseSeconds"], 60);
    assert!(json["data"]["updatedAt"].is_string());

    let json = serde_json::to_value(PoolEvent::Snapshot(vec![car("car-2", CarState::Free)])).unwrap();
    assert_eq!(json["type"], "snapshot");
    assert_eq!(json["data"][0]["id"], "car-2");
    assert!(json["data"][0].get("holder").is_none());
    assert!(json["data"][0].get("remainingLeaseSeconds").is_none());
}
