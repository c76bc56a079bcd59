//! Per-client rate limiting over fixed time windows.
//!
//! One counter per client key, reset at window boundaries. The
//! read-check-increment sequence is atomic per key: concurrent requests from
//! the same client cannot both observe `count = N - 1` and both be admitted.
//! The store sits behind a trait so a clustered deployment can share
//! counters through an external service without touching the admit contract.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Outcome of one admit check, with enough context for the
/// `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCheck {
    pub allowed: bool,
    /// Requests counted in the current window, capped at `limit`.
    pub count: u32,
    pub limit: u32,
    /// Unix timestamp at which the current window resets.
    pub reset_at: u64,
}

impl RateCheck {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

/// Counter storage contract shared by the in-process store and any external
/// (clustered) implementation.
pub trait RateLimitStore: Send + Sync {
    /// Atomically account one request for `key` at time `now` (Unix seconds)
    /// and decide admission.
    fn check(&self, key: &str, now: u64) -> RateCheck;

    /// Drop entries whose window expired before the retention horizon.
    /// Returns the number of removed entries.
    fn purge_expired(&self, now: u64) -> usize;
}

#[derive(Debug)]
struct Window {
    window_start: u64,
    count: u32,
}

/// In-process store backed by a concurrent map. Entry access locks only the
/// owning shard, so cleanup never pauses unrelated admission checks.
pub struct MemoryStore {
    windows: DashMap<String, Window>,
    window_secs: u64,
    max_requests: u32,
    retention_secs: u64,
}

impl MemoryStore {
    pub fn new(window_secs: u64, max_requests: u32, retention_secs: u64) -> Self {
        Self {
            windows: DashMap::new(),
            window_secs: window_secs.max(1),
            max_requests,
            retention_secs,
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimitStore for MemoryStore {
    fn check(&self, key: &str, now: u64) -> RateCheck {
        let window_start = now - (now % self.window_secs);
        let reset_at = window_start + self.window_secs;

        // The entry guard holds the shard lock for the whole
        // read-check-increment sequence.
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { window_start, count: 0 });
        let window = entry.value_mut();

        if window.window_start != window_start {
            window.window_start = window_start;
            window.count = 0;
        }

        if window.count < self.max_requests {
            window.count += 1;
            RateCheck {
                allowed: true,
                count: window.count,
                limit: self.max_requests,
                reset_at,
            }
        } else {
            // Rejections do not push the counter past the budget.
            RateCheck {
                allowed: false,
                count: window.count,
                limit: self.max_requests,
                reset_at,
            }
        }
    }

    fn purge_expired(&self, now: u64) -> usize {
        let horizon = now.saturating_sub(self.window_secs + self.retention_secs);
        // Counted inside retain: len() snapshots taken around it race
        // concurrent inserts.
        let mut removed = 0;
        self.windows.retain(|_, w| {
            let keep = w.window_start >= horizon;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}

/// Admission-side handle around a [`RateLimitStore`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn admit(&self, key: &str, now: u64) -> RateCheck {
        self.store.check(key, now)
    }

    pub fn admit_now(&self, key: &str) -> RateCheck {
        self.store.check(key, unix_now())
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Periodically purge expired windows. The loop stops once every other
/// handle to the store has been dropped.
pub async fn run_cleanup(store: Arc<MemoryStore>, interval: Duration) {
    let store = Arc::downgrade(&store);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(store) = store.upgrade() else {
            break;
        };
        let removed = store.purge_expired(unix_now());
        if removed > 0 {
            tracing::debug!(
                removed,
                tracked = store.tracked_keys(),
                "Purged expired rate windows"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_enforced_within_one_window() {
        let store = MemoryStore::new(60, 60, 120);
        for i in 1..=60 {
            let check = store.check("10.0.0.5", 600);
            assert!(check.allowed, "request {} should be admitted", i);
            assert_eq!(check.count, i);
        }
        let check = store.check("10.0.0.5", 630);
        assert!(!check.allowed, "61st request in the window must be rejected");
        assert_eq!(check.count, 60);
    }

    #[test]
    fn next_window_starts_fresh() {
        let store = MemoryStore::new(60, 1, 120);
        assert!(store.check("k", 600).allowed);
        assert!(!store.check("k", 659).allowed);
        let check = store.check("k", 660);
        assert!(check.allowed, "first request of the next window is admitted");
        assert_eq!(check.count, 1);
    }

    #[test]
    fn rejections_do_not_inflate_the_counter() {
        let store = MemoryStore::new(60, 2, 120);
        store.check("k", 10);
        store.check("k", 11);
        for now in 12..30 {
            assert!(!store.check("k", now).allowed);
        }
        // A fresh window still admits normally after the rejected burst.
        assert!(store.check("k", 60).allowed);
    }

    #[test]
    fn keys_are_independent() {
        let store = MemoryStore::new(60, 1, 120);
        assert!(store.check("a", 5).allowed);
        assert!(store.check("b", 5).allowed);
        assert!(!store.check("a", 6).allowed);
    }

    #[test]
    fn reset_at_is_the_window_boundary() {
        let store = MemoryStore::new(60, 10, 120);
        let check = store.check("k", 125);
        assert_eq!(check.reset_at, 180);
        assert_eq!(check.remaining(), 9);
    }

    #[test]
    fn purge_removes_only_stale_entries() {
        let store = MemoryStore::new(60, 10, 60);
        store.check("old", 0);
        store.check("fresh", 600);
        let removed = store.purge_expired(600);
        assert_eq!(removed, 1);
        assert_eq!(store.tracked_keys(), 1);
    }

    #[test]
    fn purge_count_stays_correct_under_concurrent_inserts() {
        let store = Arc::new(MemoryStore::new(60, 10, 60));
        for i in 0..1000 {
            store.check(&format!("stale-{i}"), 0);
        }

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..5000 {
                    store.check(&format!("fresh-{i}"), 600);
                }
            })
        };

        let mut removed = 0;
        while removed < 1000 {
            removed += store.purge_expired(600);
        }
        writer.join().unwrap();

        assert_eq!(removed, 1000, "only the stale windows are counted");
        assert_eq!(store.tracked_keys(), 5000);
    }

    #[test]
    fn concurrent_checks_admit_exactly_the_budget() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let store = Arc::new(MemoryStore::new(60, 50, 120));
        let admitted = Arc::new(AtomicU32::new(0));
        let rejected = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                let admitted = admitted.clone();
                let rejected = rejected.clone();
                std::thread::spawn(move || {
                    if store.check("203.0.113.7", 30).allowed {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    } else {
                        rejected.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 50);
        assert_eq!(rejected.load(Ordering::SeqCst), 50);
    }
}
