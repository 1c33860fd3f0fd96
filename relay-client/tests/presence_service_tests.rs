mod common;

use common::*;
use relay_client::{HttpPresenceApi, PresenceApi, PresenceTracker};
use relay_types::BrowserId;
use std::time::Duration;

#[tokio::test]
async fn test_http_api_against_presence_service() {
    let (addr, _registry) = spawn_presence_server(Duration::from_secs(15));
    let api = HttpPresenceApi::new(format!("http://{}/presence/", addr));
    let me = BrowserId::from("me".to_string());

    assert_eq!(api.get().await.unwrap(), 0);
    assert_eq!(api.increment(Some(&me)).await.unwrap(), 1);
    assert_eq!(api.increment(None).await.unwrap(), 2);
    assert_eq!(api.heartbeat(&me).await.unwrap(), 2);
    assert_eq!(api.decrement(Some(&me)).await.unwrap(), 1);
    assert_eq!(api.decrement(None).await.unwrap(), 0);
    assert_eq!(api.decrement(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_tracker_registers_and_deregisters() {
    let (addr, registry) = spawn_presence_server(Duration::from_secs(15));
    let tracker = PresenceTracker::spawn(
        HttpPresenceApi::new(format!("http://{}/presence", addr)),
        Some(BrowserId::generate()),
        Duration::from_millis(50),
    );
    let mut count = tracker.subscribe();

    tokio::time::timeout(TIMEOUT, count.wait_for(|n| *n == 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registry.count(), 1);

    tracker.shutdown().await;
    assert_eq!(registry.count(), 0);
}

#[tokio::test]
async fn test_unreachable_service_keeps_last_count() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let api = HttpPresenceApi::new(format!("http://{}/presence", addr));
    assert!(api.get().await.is_err());

    let tracker = PresenceTracker::spawn(api, None, Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(tracker.current(), 0);
    tracker.shutdown().await;
}
