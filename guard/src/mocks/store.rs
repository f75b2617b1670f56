//! Instrumented counter store for testing.

use crate::error::{GuardError, Result};
use crate::providers::{CounterStore, FailureStore, WindowCount, WindowKey};
use crate::stores::MemoryStore;
use bulwark_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct StoreProbe {
    unavailable: AtomicBool,
    hanging: AtomicBool,
    window_calls: AtomicUsize,
    failure_reads: AtomicUsize,
    failure_increments: AtomicUsize,
    failure_resets: AtomicUsize,
}

/// [`MemoryStore`] wrapper that counts calls and can simulate outages.
///
/// Every call is counted before the outage switches are consulted, so a
/// test can assert that a stage was (or was not) reached even when the
/// store is down.
///
/// # Example
///
/// ```
/// use bulwark_guard::mocks::MockStore;
/// use bulwark_guard::providers::FailureStore;
///
/// # tokio_test::block_on(async {
/// let store = MockStore::new();
/// store.set_unavailable(true);
///
/// assert!(store.failed_attempts("user@example.com").await.is_err());
/// assert_eq!(store.failure_reads(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockStore<K = SystemClock> {
    inner: MemoryStore<K>,
    probe: Arc<StoreProbe>,
}

impl MockStore<SystemClock> {
    /// Create a healthy store driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MockStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> MockStore<K> {
    /// Create a healthy store driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: K) -> Self {
        Self {
            inner: MemoryStore::with_clock(clock),
            probe: Arc::new(StoreProbe::default()),
        }
    }

    /// Make every call fail with [`GuardError::StoreUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.probe.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every call wait forever.
    pub fn set_hanging(&self, hanging: bool) {
        self.probe.hanging.store(hanging, Ordering::SeqCst);
    }

    /// Backing in-memory store.
    #[must_use]
    pub const fn memory(&self) -> &MemoryStore<K> {
        &self.inner
    }

    /// Number of `increment_or_reset` calls.
    #[must_use]
    pub fn window_calls(&self) -> usize {
        self.probe.window_calls.load(Ordering::SeqCst)
    }

    /// Number of `failed_attempts` calls.
    #[must_use]
    pub fn failure_reads(&self) -> usize {
        self.probe.failure_reads.load(Ordering::SeqCst)
    }

    /// Number of `increment_failures` calls.
    #[must_use]
    pub fn failure_increments(&self) -> usize {
        self.probe.failure_increments.load(Ordering::SeqCst)
    }

    /// Number of `reset_failures` calls.
    #[must_use]
    pub fn failure_resets(&self) -> usize {
        self.probe.failure_resets.load(Ordering::SeqCst)
    }

    /// Total calls into the failure counter operations.
    #[must_use]
    pub fn failure_calls(&self) -> usize {
        self.failure_reads() + self.failure_increments() + self.failure_resets()
    }

    async fn admit(&self, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);

        if self.probe.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.probe.unavailable.load(Ordering::SeqCst) {
            return Err(GuardError::StoreUnavailable("Mock store offline".into()));
        }

        Ok(())
    }
}

impl<K: Clock> CounterStore for MockStore<K> {
    async fn increment_or_reset(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowCount> {
        self.admit(&self.probe.window_calls).await?;
        self.inner.increment_or_reset(key, limit, window).await
    }
}

impl<K: Clock> FailureStore for MockStore<K> {
    async fn failed_attempts(&self, account: &str) -> Result<u32> {
        self.admit(&self.probe.failure_reads).await?;
        self.inner.failed_attempts(account).await
    }

    async fn increment_failures(&self, account: &str) -> Result<u32> {
        self.admit(&self.probe.failure_increments).await?;
        self.inner.increment_failures(account).await
    }

    async fn reset_failures(&self, account: &str) -> Result<()> {
        self.admit(&self.probe.failure_resets).await?;
        self.inner.reset_failures(account).await
    }
}
