use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// "Current users" count backed by per-client leases.
///
/// Callers that identify themselves hold a lease that must be renewed within
/// the TTL. Callers that don't fall back to a bare counter (the legacy
/// contract) which can't tell a closed tab from an open one and never
/// expires.
pub struct PresenceRegistry {
    leases: DashMap<String, Instant>,
    anonymous: AtomicU64,
    ttl: Duration,
}

impl PresenceRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            leases: DashMap::new(),
            anonymous: AtomicU64::new(0),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live leases plus the anonymous counter.
    pub fn count(&self) -> u64 {
        let now = Instant::now();
        let live = self
            .leases
            .iter()
            .filter(|lease| !self.is_expired(*lease.value(), now))
            .count() as u64;
        live + self.anonymous.load(Ordering::SeqCst)
    }

    pub fn increment(&self, client_id: Option<&str>) -> u64 {
        match client_id {
            Some(id) => self.renew(id),
            None => {
                let count = self.anonymous.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("Anonymous presence incremented to {} (legacy counter)", count);
            }
        }
        self.count()
    }

    pub fn decrement(&self, client_id: Option<&str>) -> u64 {
        match client_id {
            Some(id) => {
                if self.leases.remove(id).is_some() {
                    debug!("Released presence lease for {}", id);
                }
            }
            None => {
                // Floor of zero: an extra decrement is a no-op.
                let _ = self
                    .anonymous
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            }
        }
        self.count()
    }

    pub fn heartbeat(&self, client_id: &str) -> u64 {
        self.renew(client_id);
        self.count()
    }

    /// Drop every lease older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.leases.len();
        self.leases.retain(|_, seen| !self.is_expired(*seen, now));
        let removed = before.saturating_sub(self.leases.len());
        if removed > 0 {
            info!("Expired {} presence lease(s)", removed);
        }
        removed
    }

    pub fn lease_count(&self) -> usize {
        self.leases.len()
    }

    fn renew(&self, client_id: &str) {
        if self
            .leases
            .insert(client_id.to_string(), Instant::now())
            .is_none()
        {
            debug!("New presence lease for {}", client_id);
        }
    }

    fn is_expired(&self, seen: Instant, now: Instant) -> bool {
        now.saturating_duration_since(seen) >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PresenceRegistry {
        PresenceRegistry::new(Duration::from_secs(15))
    }

    #[test]
    fn test_anonymous_counter_never_goes_negative() {
        let presence = registry();
        assert_eq!(presence.decrement(None), 0);
        assert_eq!(presence.increment(None), 1);
        assert_eq!(presence.increment(None), 2);
        assert_eq!(presence.decrement(None), 1);
        assert_eq!(presence.decrement(None), 0);
        assert_eq!(presence.decrement(None), 0);
        assert_eq!(presence.count(), 0);
    }

    #[test]
    fn test_lease_is_counted_once_per_client() {
        let presence = registry();
        assert_eq!(presence.increment(Some("a")), 1);
        assert_eq!(presence.increment(Some("a")), 1);
        assert_eq!(presence.heartbeat("b"), 2);
        assert_eq!(presence.increment(None), 3);

        assert_eq!(presence.decrement(Some("a")), 2);
        assert_eq!(presence.decrement(Some("a")), 2);
        assert_eq!(presence.decrement(Some("unknown")), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leases_expire_without_heartbeat() {
        let presence = registry();
        presence.increment(Some("stays"));
        presence.increment(Some("leaves"));
        assert_eq!(presence.count(), 2);

        tokio::time::advance(Duration::from_secs(10)).await;
        presence.heartbeat("stays");

        tokio::time::advance(Duration::from_secs(6)).await;
        // Expired leases are ignored even before the sweep runs.
        assert_eq!(presence.count(), 1);
        assert_eq!(presence.lease_count(), 2);

        assert_eq!(presence.sweep_expired(), 1);
        assert_eq!(presence.lease_count(), 1);
        assert_eq!(presence.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_can_be_renewed() {
        let presence = registry();
        presence.increment(Some("a"));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(presence.count(), 0);

        assert_eq!(presence.heartbeat("a"), 1);
        assert_eq!(presence.sweep_expired(), 0);
    }
}
