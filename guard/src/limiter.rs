//! Fixed-window rate limiter.
//!
//! # Failure policy
//!
//! The limiter **fails open**. When the counter store errors or does not
//! answer within the store timeout, the request is allowed and the condition
//! is logged at `warn` and counted in `bulwark.rate_limiter.fail_open`.

use crate::config::{EndpointLimit, GuardConfig};
use crate::error::{GuardError, bounded};
use crate::outcome::THROTTLED_MESSAGE;
use crate::providers::{CounterStore, WindowCount, WindowKey};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request may proceed.
    pub allowed: bool,

    /// Generic throttling message when denied. Never names the limit or window.
    pub retry_message: Option<&'static str>,
}

impl RateLimitResult {
    /// Request may proceed.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            retry_message: None,
        }
    }

    /// Request is throttled.
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            allowed: false,
            retry_message: Some(THROTTLED_MESSAGE),
        }
    }
}

impl From<WindowCount> for RateLimitResult {
    fn from(count: WindowCount) -> Self {
        if count.allowed {
            Self::allowed()
        } else {
            Self::denied()
        }
    }
}

/// Fixed-window rate limiter over a [`CounterStore`].
///
/// # Example
///
/// ```
/// use bulwark_guard::RateLimiter;
/// use bulwark_guard::stores::MemoryStore;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let limiter = RateLimiter::new(MemoryStore::new());
///
/// let first = limiter.allow("203.0.113.7", "login", 1, Duration::from_secs(60)).await;
/// let second = limiter.allow("203.0.113.7", "login", 1, Duration::from_secs(60)).await;
/// assert!(first.allowed);
/// assert!(!second.allowed);
/// assert!(second.retry_message.is_some());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter<S> {
    store: S,
    endpoints: Arc<[EndpointLimit]>,
    store_timeout: Duration,
}

impl<S: CounterStore> RateLimiter<S> {
    /// Create a limiter with the default endpoint table and store timeout.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::from_config(store, &GuardConfig::default())
    }

    /// Create a limiter using the endpoint table and timeout from `config`.
    #[must_use]
    pub fn from_config(store: S, config: &GuardConfig) -> Self {
        Self {
            store,
            endpoints: config.endpoints.clone().into(),
            store_timeout: config.store_timeout(),
        }
    }

    /// Set the per-call store timeout.
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Count one request for `(subject, endpoint)` and decide whether it may proceed.
    ///
    /// `subject` is opaque and used only as part of the counter key.
    pub async fn allow(
        &self,
        subject: &str,
        endpoint: &str,
        limit: u32,
        window: Duration,
    ) -> RateLimitResult {
        let key = WindowKey::new(subject, endpoint);

        match bounded(
            self.store_timeout,
            self.store.increment_or_reset(&key, limit, window),
        )
        .await
        {
            Ok(count) if count.allowed => {
                tracing::debug!(
                    subject = %subject,
                    endpoint = %endpoint,
                    count = count.count,
                    limit = limit,
                    "Rate limit check passed"
                );
                count.into()
            }
            Ok(count) => {
                tracing::warn!(
                    rate_limit_exceeded = true,
                    subject = %subject,
                    endpoint = %endpoint,
                    count = count.count,
                    limit = limit,
                    "Rate limit exceeded"
                );
                count.into()
            }
            Err(error) => Self::fail_open(endpoint, &error),
        }
    }

    /// Like [`allow`](Self::allow), with the budget taken from the endpoint table.
    ///
    /// A built-in endpoint missing from the table is limited with its default
    /// budget. Any other unlisted endpoint is allowed.
    pub async fn check(&self, subject: &str, endpoint: &str) -> RateLimitResult {
        let budget = match self.limit_for(endpoint) {
            Some(budget) => (budget.limit, budget.window()),
            None => match EndpointLimit::builtin(endpoint) {
                Some(builtin) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        limit = builtin.limit,
                        "No rate limit configured for endpoint, using default budget"
                    );
                    (builtin.limit, builtin.window())
                }
                None => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        "No rate limit configured for endpoint, allowing request"
                    );
                    return RateLimitResult::allowed();
                }
            },
        };

        self.allow(subject, endpoint, budget.0, budget.1).await
    }

    /// Configured budget for `endpoint`.
    #[must_use]
    pub fn limit_for(&self, endpoint: &str) -> Option<&EndpointLimit> {
        self.endpoints.iter().find(|limit| limit.endpoint == endpoint)
    }

    fn fail_open(endpoint: &str, error: &GuardError) -> RateLimitResult {
        tracing::warn!(
            error = %error,
            endpoint = %endpoint,
            "Counter store failed, rate limiter failing open"
        );
        metrics::counter!("bulwark.rate_limiter.fail_open", "endpoint" => endpoint.to_string())
            .increment(1);
        RateLimitResult::allowed()
    }
}

impl<S> RateLimiter<S> {
    /// Per-call store timeout.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}
