//! Redis-based counter store implementation.
//!
//! # Algorithm
//!
//! Fixed window with a self-expiring counter:
//! 1. `INCR` the window key
//! 2. On the first hit (or if the key somehow lost its TTL), `PEXPIRE` it to
//!    the window length
//! 3. Return the new count
//!
//! Both steps run inside one Lua script, so Redis serializes the whole
//! read-modify-write. When the key expires the next `INCR` starts a fresh
//! window at 1.
//!
//! Failure counters are plain integer keys with no TTL: an elevated account
//! stays elevated until a successful login resets it.

use crate::error::{GuardError, Result};
use crate::providers::failure_store::failure_key;
use crate::providers::{CounterStore, FailureStore, WindowCount, WindowKey};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::sync::Arc;
use std::time::Duration;

/// Lua script for an atomic fixed-window increment.
///
/// `KEYS[1]` = window key, `ARGV[1]` = window length in milliseconds.
const FIXED_WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) == -1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// `Redis`-backed fixed-window and failure counter store.
///
/// # Example
///
/// ```no_run
/// use bulwark_guard::stores::RedisStore;
/// use bulwark_guard::providers::{CounterStore, WindowKey};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisStore::new("redis://127.0.0.1:6379").await?;
///
/// // 10 attempts per 15 minutes
/// let key = WindowKey::new("203.0.113.7", "login");
/// let result = store.increment_or_reset(&key, 10, std::time::Duration::from_secs(900)).await?;
/// println!("allowed: {}", result.allowed);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Pre-hashed fixed-window script (sent with `EVALSHA`, loaded on demand).
    window_script: Arc<Script>,
}

impl RedisStore {
    /// Create a new `Redis` store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`] for a malformed URL and
    /// [`GuardError::StoreUnavailable`] if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            GuardError::Configuration(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            GuardError::StoreUnavailable(format!(
                "Failed to create Redis connection manager: {e}"
            ))
        })?;

        Ok(Self::from_connection_manager(conn_manager))
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub fn from_connection_manager(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            window_script: Arc::new(Script::new(FIXED_WINDOW_SCRIPT)),
        }
    }
}

impl CounterStore for RedisStore {
    async fn increment_or_reset(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowCount> {
        let mut conn = self.conn_manager.clone();
        let window_key = key.storage_key();
        #[allow(clippy::cast_possible_truncation)] // Safe: rate limit windows are small durations
        let window_ms = window.as_millis().max(1) as u64;

        let count: u32 = self
            .window_script
            .key(&window_key)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    endpoint = %key.endpoint,
                    "Redis fixed-window script failed"
                );
                GuardError::StoreUnavailable(format!("Failed to update rate limit window: {e}"))
            })?;

        tracing::debug!(
            endpoint = %key.endpoint,
            count = count,
            limit = limit,
            window_ms = window_ms,
            "Rate limit window updated"
        );

        Ok(WindowCount::against(count, limit))
    }
}

impl FailureStore for RedisStore {
    async fn failed_attempts(&self, account: &str) -> Result<u32> {
        let mut conn = self.conn_manager.clone();

        let count: Option<u32> = conn.get(failure_key(account)).await.map_err(|e| {
            GuardError::StoreUnavailable(format!("Failed to read failure counter: {e}"))
        })?;

        Ok(count.unwrap_or(0))
    }

    async fn increment_failures(&self, account: &str) -> Result<u32> {
        let mut conn = self.conn_manager.clone();

        let count: u32 = conn.incr(failure_key(account), 1).await.map_err(|e| {
            GuardError::StoreUnavailable(format!("Failed to increment failure counter: {e}"))
        })?;

        Ok(count)
    }

    async fn reset_failures(&self, account: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn.del(failure_key(account)).await.map_err(|e| {
            GuardError::StoreUnavailable(format!("Failed to reset failure counter: {e}"))
        })?;

        tracing::debug!("Reset failure counter");

        Ok(())
    }
}
