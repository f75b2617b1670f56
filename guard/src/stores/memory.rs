//! In-process counter store.
//!
//! Suitable for single-instance deployments and tests. Each key lives in a
//! `DashMap` shard; the shard's write lock is held for the whole
//! read-modify-write through the entry API, which gives the same per-key
//! atomicity as the shared stores.
//!
//! **Multi-instance deployments must use `RedisStore` or `PostgresStore`**:
//! counts kept here are invisible to other processes.
//!
//! # Memory
//!
//! Every [`PURGE_INTERVAL`]th window update also drops windows whose own
//! length has elapsed. Failure counters have no time decay: an entry stays
//! until a successful login resets it, so one entry exists per account that
//! has failed since its last success, known or not.

use crate::error::{GuardError, Result};
use crate::providers::{CounterStore, FailureStore, WindowCount, WindowKey};
use bulwark_core::environment::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Window updates between two opportunistic purges of expired windows.
pub const PURGE_INTERVAL: u64 = 1024;

/// Stored state of one fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowState {
    count: u32,
    window_start: DateTime<Utc>,
    window: chrono::Duration,
}

impl WindowState {
    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.window_start >= self.window
    }
}

/// In-memory fixed-window and failure counter store.
///
/// Clones share the same maps.
///
/// # Example
///
/// ```
/// use bulwark_guard::providers::{CounterStore, WindowKey};
/// use bulwark_guard::stores::MemoryStore;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let key = WindowKey::new("203.0.113.7", "login");
///
/// let first = store.increment_or_reset(&key, 1, Duration::from_secs(60)).await.unwrap();
/// let second = store.increment_or_reset(&key, 1, Duration::from_secs(60)).await.unwrap();
/// assert!(first.allowed);
/// assert!(!second.allowed);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore<K = SystemClock> {
    windows: Arc<DashMap<WindowKey, WindowState>>,
    failures: Arc<DashMap<String, u32>>,
    updates: Arc<AtomicU64>,
    clock: K,
}

impl MemoryStore<SystemClock> {
    /// Create a store driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> MemoryStore<K> {
    /// Create a store driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: K) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            updates: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Current count for `key`, zero if absent. Does not consider expiry.
    #[must_use]
    pub fn window_count(&self, key: &WindowKey) -> u32 {
        self.windows.get(key).map_or(0, |state| state.count)
    }

    /// Drop windows that started more than `older_than` ago.
    ///
    /// Absence is equivalent to a zero count, so this never changes a
    /// limiting decision. Returns the number of removed windows.
    pub fn purge_windows(&self, older_than: Duration) -> usize {
        let Ok(older_than) = chrono::Duration::from_std(older_than) else {
            return 0;
        };
        let cutoff = self.clock.now() - older_than;
        let before = self.windows.len();
        self.windows.retain(|_, state| state.window_start >= cutoff);
        let removed = before.saturating_sub(self.windows.len());

        tracing::debug!(removed = removed, "Purged expired rate limit windows");
        removed
    }

    /// Drop windows whose own length has elapsed.
    ///
    /// Runs on its own every [`PURGE_INTERVAL`] updates. Returns the number
    /// of removed windows.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, state| !state.expired_at(now));
        let removed = before.saturating_sub(self.windows.len());

        tracing::debug!(removed = removed, "Purged expired rate limit windows");
        removed
    }

    /// Number of tracked windows, expired or not.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.windows.len()
    }
}

impl<K: Clock> CounterStore for MemoryStore<K> {
    async fn increment_or_reset(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowCount> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| GuardError::Configuration(format!("Window out of range: {e}")))?;
        let now = self.clock.now();

        // The shard lock is held until `entry` is dropped at the end of the match.
        let count = match self.windows.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                if now - state.window_start < window {
                    state.count = state.count.saturating_add(1);
                } else {
                    *state = WindowState {
                        count: 1,
                        window_start: now,
                        window,
                    };
                }
                state.count
            }
            Entry::Vacant(vacant) => {
                vacant.insert(WindowState {
                    count: 1,
                    window_start: now,
                    window,
                });
                1
            }
        };

        if self.updates.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_expired();
        }

        Ok(WindowCount::against(count, limit))
    }
}

impl<K: Clock> FailureStore for MemoryStore<K> {
    async fn failed_attempts(&self, account: &str) -> Result<u32> {
        Ok(self.failures.get(account).map_or(0, |count| *count))
    }

    async fn increment_failures(&self, account: &str) -> Result<u32> {
        let mut count = self.failures.entry(account.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        Ok(*count)
    }

    async fn reset_failures(&self, account: &str) -> Result<()> {
        self.failures.remove(account);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bulwark_testing::{ManualClock, test_clock};
    use proptest::prelude::*;

    fn manual_store() -> (MemoryStore<ManualClock>, ManualClock) {
        let clock = ManualClock::starting_at(test_clock().now());
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_first_request_creates_window() {
        let (store, _clock) = manual_store();
        let key = WindowKey::new("10.0.0.1", "login");

        let result = store
            .increment_or_reset(&key, 10, Duration::from_secs(900))
            .await
            .unwrap();

        assert_eq!(result, WindowCount { count: 1, allowed: true });
        assert_eq!(store.window_count(&key), 1);
    }

    #[tokio::test]
    async fn test_fixed_window_boundary() {
        let (store, clock) = manual_store();
        let key = WindowKey::new("10.0.0.1", "login");
        let window = Duration::from_secs(900);

        for _ in 0..10 {
            assert!(store.increment_or_reset(&key, 10, window).await.unwrap().allowed);
        }

        clock.advance(chrono::Duration::seconds(1));
        let eleventh = store.increment_or_reset(&key, 10, window).await.unwrap();
        assert_eq!(eleventh, WindowCount { count: 11, allowed: false });

        clock.advance(chrono::Duration::seconds(900));
        let twelfth = store.increment_or_reset(&key, 10, window).await.unwrap();
        assert_eq!(twelfth, WindowCount { count: 1, allowed: true });
    }

    #[tokio::test]
    async fn test_window_expires_exactly_at_length() {
        let (store, clock) = manual_store();
        let key = WindowKey::new("10.0.0.1", "register");
        let window = Duration::from_secs(60);

        store.increment_or_reset(&key, 1, window).await.unwrap();

        clock.advance(chrono::Duration::seconds(59));
        assert!(!store.increment_or_reset(&key, 1, window).await.unwrap().allowed);

        clock.advance(chrono::Duration::seconds(1));
        assert!(store.increment_or_reset(&key, 1, window).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (store, _clock) = manual_store();
        let window = Duration::from_secs(60);
        let login = WindowKey::new("10.0.0.1", "login");
        let register = WindowKey::new("10.0.0.1", "register");
        let other_subject = WindowKey::new("10.0.0.2", "login");

        store.increment_or_reset(&login, 1, window).await.unwrap();
        assert!(!store.increment_or_reset(&login, 1, window).await.unwrap().allowed);
        assert!(store.increment_or_reset(&register, 1, window).await.unwrap().allowed);
        assert!(store.increment_or_reset(&other_subject, 1, window).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_zero_limit_denies_everything() {
        let (store, _clock) = manual_store();
        let key = WindowKey::new("10.0.0.1", "login");

        let result = store
            .increment_or_reset(&key, 0, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!result.allowed);
    }

    #[tokio::test]
    async fn test_failure_counter_lifecycle() {
        let (store, _clock) = manual_store();

        assert_eq!(store.failed_attempts("user@example.com").await.unwrap(), 0);
        assert_eq!(store.increment_failures("user@example.com").await.unwrap(), 1);
        assert_eq!(store.increment_failures("user@example.com").await.unwrap(), 2);
        assert_eq!(store.failed_attempts("other@example.com").await.unwrap(), 0);

        store.reset_failures("user@example.com").await.unwrap();
        assert_eq!(store.failed_attempts("user@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_windows_keeps_active() {
        let (store, clock) = manual_store();
        let window = Duration::from_secs(60);
        let stale = WindowKey::new("10.0.0.1", "login");
        let fresh = WindowKey::new("10.0.0.2", "login");

        store.increment_or_reset(&stale, 5, window).await.unwrap();
        clock.advance(chrono::Duration::seconds(120));
        store.increment_or_reset(&fresh, 5, window).await.unwrap();

        assert_eq!(store.purge_windows(window), 1);
        assert_eq!(store.window_count(&stale), 0);
        assert_eq!(store.window_count(&fresh), 1);
    }

    #[tokio::test]
    async fn test_purge_expired_uses_each_window_length() {
        let (store, clock) = manual_store();
        let short = WindowKey::new("10.0.0.1", "challenge-verify");
        let long = WindowKey::new("10.0.0.1", "register");

        store.increment_or_reset(&short, 5, Duration::from_secs(60)).await.unwrap();
        store.increment_or_reset(&long, 5, Duration::from_secs(3600)).await.unwrap();
        clock.advance(chrono::Duration::seconds(60));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.window_count(&short), 0);
        assert_eq!(store.window_count(&long), 1);
    }

    #[tokio::test]
    async fn test_expired_windows_are_purged_without_host_call() {
        let (store, clock) = manual_store();
        let window = Duration::from_secs(60);

        for i in 0..100 {
            let key = WindowKey::new(format!("10.0.1.{i}"), "login");
            store.increment_or_reset(&key, 5, window).await.unwrap();
        }
        assert_eq!(store.window_len(), 100);

        clock.advance(chrono::Duration::seconds(61));
        let active = WindowKey::new("10.0.2.1", "login");
        for _ in 0..PURGE_INTERVAL - 100 {
            store.increment_or_reset(&active, 5, window).await.unwrap();
        }

        assert_eq!(store.window_len(), 1);
        assert_eq!(store.window_count(&active), u32::try_from(PURGE_INTERVAL - 100).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_not_lost() {
        let store = MemoryStore::new();

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_failures("target@example.com").await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.failed_attempts("target@example.com").await.unwrap(), 100);
    }

    proptest! {
        #[test]
        fn prop_allowed_requests_never_exceed_limit(requests in 1u32..60, limit in 0u32..30) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (store, _clock) = manual_store();
            let key = WindowKey::new("198.51.100.1", "login");

            let allowed = runtime.block_on(async {
                let mut allowed = 0u32;
                for _ in 0..requests {
                    if store.increment_or_reset(&key, limit, Duration::from_secs(900)).await.unwrap().allowed {
                        allowed += 1;
                    }
                }
                allowed
            });

            prop_assert_eq!(allowed, requests.min(limit));
            prop_assert_eq!(store.window_count(&key), requests);
        }
    }
}
