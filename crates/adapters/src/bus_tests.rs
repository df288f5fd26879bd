// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn publish_records_payload_for_assertion() {
    let bus = InMemoryBus::new();
    bus.publish("reporting.jobs.builds", b"hello".to_vec()).await.unwrap();
    assert_eq!(bus.published("reporting.jobs.builds"), vec![b"hello".to_vec()]);
}

#[tokio::test]
async fn subscribe_then_publish_delivers_message() {
    let bus = InMemoryBus::new();
    let mut sub = bus.subscribe("builds").await.unwrap();
    bus.publish("builds", b"payload".to_vec()).await.unwrap();

    let delivery = sub.recv().await.unwrap();
    assert_eq!(delivery.payload, b"payload");
    assert!(!delivery.redelivered);
}

#[tokio::test]
async fn ack_is_recorded_exactly_once() {
    let bus = InMemoryBus::new();
    let mut sub = bus.subscribe("builds").await.unwrap();
    bus.publish("builds", b"a".to_vec()).await.unwrap();
    bus.publish("builds", b"b".to_vec()).await.unwrap();

    let d1 = sub.recv().await.unwrap();
    let d2 = sub.recv().await.unwrap();
    d1.ack();
    d2.ack();

    assert_eq!(bus.ack_count(), 2);
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_stops_delivery() {
    let bus = InMemoryBus::new();
    let mut sub = bus.subscribe("builds").await.unwrap();
    sub.unsubscribe();
    sub.unsubscribe();
    assert!(sub.recv().await.is_none());
}
