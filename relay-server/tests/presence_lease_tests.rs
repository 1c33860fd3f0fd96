
use relay_server::spawn_lease_sweeper;
use std::time::Duration;
use test_helpers::*;

#[tokio::test(start_paused = true)]
async fn test_closed_tab_without_decrement_expires() {
    let service = TestPresenceService::new();

    assert_eq!(service.increment("tab-1").await, 1);
    assert_eq!(service.increment("tab-2").await, 2);

    // tab-2 keeps its lease alive, tab-1 vanishes without saying goodbye.
    for _ in 0..4 {
        tokio::time::advance(Duration::from_secs(5)).await;
        service.heartbeat("tab-2").await;
    }

    assert_eq!(service.count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_removes_expired_leases() {
    let service = TestPresenceService::new();
    let sweeper = spawn_lease_sweeper(service.registry.clone(), Duration::from_secs(5));

    service.increment("a").await;
    service.increment("b").await;
    assert_eq!(service.registry.lease_count(), 2);

    tokio::time::sleep(TEST_TTL + Duration::from_secs(6)).await;
    assert_eq!(service.registry.lease_count(), 0);
    assert_eq!(service.count().await, 0);

    sweeper.abort();
}

#[tokio::test]
async fn test_count_never_negative_for_any_sequence() {
    let service = TestPresenceService::new();

    let steps = [
        ("POST", "/presence/decrement"),
        ("POST", "/presence/decrement?clientId=ghost"),
        ("POST", "/presence/increment"),
        ("POST", "/presence/increment?clientId=a"),
        ("POST", "/presence/decrement"),
        ("POST", "/presence/decrement"),
        ("POST", "/presence/decrement?clientId=a"),
        ("POST", "/presence/decrement?clientId=a"),
    ];
    let mut seen = Vec::new();
    for (method, path) in steps {
        seen.push(service.call(method, path).await);
    }

    assert_eq!(seen, vec![0, 0, 1, 2, 1, 1, 0, 0]);
}

#[tokio::test]
async fn test_reopened_tab_is_counted_once() {
    let service = TestPresenceService::new();

    service.increment("tab").await;
    service.decrement("tab").await;
    service.increment("tab").await;
    service.increment("tab").await;

    assert_eq!(service.count().await, 1);
}
