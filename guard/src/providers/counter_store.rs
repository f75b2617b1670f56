//! Fixed-window counter store trait.
//!
//! # Security
//!
//! The read-modify-write of a window counter MUST run as one atomic
//! operation inside the storage layer. Two concurrent requests for the same
//! key must never both observe `N` and both write `N + 1`.
//!
//! # Implementation
//!
//! - **Redis**: server-side Lua script (`INCR` + `PEXPIRE` on first hit)
//! - **PostgreSQL**: single `INSERT .. ON CONFLICT .. DO UPDATE .. RETURNING`
//! - **Single instance**: `DashMap` entry held across the update

use crate::constants::keys;
use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// Composite identity of one fixed-window counter.
///
/// The subject is opaque: it is never parsed or validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    /// Caller identity (usually a client address).
    pub subject: String,

    /// Guarded endpoint name.
    pub endpoint: String,
}

impl WindowKey {
    /// Create a new window key.
    #[must_use]
    pub fn new(subject: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Flat key for key-value stores.
    ///
    /// The endpoint comes first so that subjects containing `:` (IPv6
    /// addresses, for one) cannot collide with another endpoint's keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_guard::providers::WindowKey;
    ///
    /// let key = WindowKey::new("::1", "login");
    /// assert_eq!(key.storage_key(), "bulwark:rl:login:::1");
    /// ```
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}{}:{}", keys::RATE_LIMIT_PREFIX, self.endpoint, self.subject)
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.endpoint, self.subject)
    }
}

/// Result of one counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests counted in the active window, including this one.
    pub count: u32,

    /// `count <= limit`.
    pub allowed: bool,
}

impl WindowCount {
    /// Build a result for `count` against `limit`.
    #[must_use]
    pub const fn against(count: u32, limit: u32) -> Self {
        Self {
            count,
            allowed: count <= limit,
        }
    }
}

/// Fixed-window counter store.
///
/// # Semantics
///
/// `increment_or_reset` behaves exactly like this, atomically:
///
/// - no record: create `count = 1, window_start = now`, return `(1, 1 <= limit)`
/// - `now - window_start < window`: increment, return `(count, count <= limit)`
/// - window expired: reset to `count = 1, window_start = now`, return `(1, 1 <= limit)`
///
/// A zero `limit` therefore denies every request.
pub trait CounterStore: Send + Sync {
    /// Count one request against `key` and report whether it fits `limit`.
    ///
    /// # Arguments
    ///
    /// * `key` - Composite `(subject, endpoint)` key
    /// * `limit` - Requests allowed per window
    /// * `window` - Window length
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::StoreUnavailable`](crate::GuardError::StoreUnavailable)
    /// if the store cannot be reached.
    fn increment_or_reset(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<WindowCount>> + Send;
}
