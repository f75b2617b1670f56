//! PostgreSQL counter store implementation.
//!
//! Each counter update is a single `INSERT .. ON CONFLICT .. DO UPDATE ..
//! RETURNING` statement. PostgreSQL takes the row lock for the conflicting
//! key, evaluates the `CASE` expressions against the locked row and returns
//! the new count, so concurrent updates to one key are serialized by the
//! database rather than by the caller.
//!
//! # Example
//!
//! ```no_run
//! use bulwark_guard::stores::postgres::PostgresStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/guard").await?;
//! let store = PostgresStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{GuardError, Result};
use crate::providers::{CounterStore, FailureStore, WindowCount, WindowKey};
use bulwark_core::environment::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

/// PostgreSQL fixed-window and failure counter store.
#[derive(Clone)]
pub struct PostgresStore<K = SystemClock> {
    /// PostgreSQL connection pool.
    pool: PgPool,

    /// Source of `now` for window arithmetic.
    clock: K,
}

impl PostgresStore<SystemClock> {
    /// Create a new PostgreSQL store driven by the system clock.
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            clock: SystemClock,
        }
    }
}

impl<K: Clock> PostgresStore<K> {
    /// Create a store driven by `clock`.
    #[must_use]
    pub const fn with_clock(pool: PgPool, clock: K) -> Self {
        Self { pool, clock }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GuardError::StoreUnavailable(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Delete windows that started before `cutoff`.
    ///
    /// Absence reads as a zero count, so this is safe to run at any time.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub async fn delete_windows_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE window_start < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| GuardError::StoreUnavailable(format!("Failed to purge windows: {e}")))?;

        tracing::debug!(removed = result.rows_affected(), "Purged expired rate limit windows");

        Ok(result.rows_affected())
    }
}

/// Convert a stored non-negative integer count.
fn stored_count(count: i32) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| GuardError::StoreUnavailable(format!("Corrupt counter value: {count}")))
}

impl<K: Clock> CounterStore for PostgresStore<K> {
    async fn increment_or_reset(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowCount> {
        let now = self.clock.now();

        let (count,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO rate_limit_counters (subject_key, endpoint, count, window_start)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (subject_key, endpoint) DO UPDATE SET
                count = CASE
                    WHEN rate_limit_counters.window_start > $3 - make_interval(secs => $4)
                    THEN rate_limit_counters.count + 1
                    ELSE 1
                END,
                window_start = CASE
                    WHEN rate_limit_counters.window_start > $3 - make_interval(secs => $4)
                    THEN rate_limit_counters.window_start
                    ELSE $3
                END
            RETURNING count
            ",
        )
        .bind(&key.subject)
        .bind(&key.endpoint)
        .bind(now)
        .bind(window.as_secs_f64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                endpoint = %key.endpoint,
                "PostgreSQL fixed-window upsert failed"
            );
            GuardError::StoreUnavailable(format!("Failed to update rate limit window: {e}"))
        })?;

        Ok(WindowCount::against(stored_count(count)?, limit))
    }
}

impl<K: Clock> FailureStore for PostgresStore<K> {
    async fn failed_attempts(&self, account: &str) -> Result<u32> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT failed_attempts FROM account_failures WHERE account = $1")
                .bind(account)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    GuardError::StoreUnavailable(format!("Failed to read failure counter: {e}"))
                })?;

        row.map_or(Ok(0), |(count,)| stored_count(count))
    }

    async fn increment_failures(&self, account: &str) -> Result<u32> {
        let (count,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO account_failures (account, failed_attempts, updated_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (account) DO UPDATE SET
                failed_attempts = account_failures.failed_attempts + 1,
                updated_at = EXCLUDED.updated_at
            RETURNING failed_attempts
            ",
        )
        .bind(account)
        .bind(self.clock.now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            GuardError::StoreUnavailable(format!("Failed to increment failure counter: {e}"))
        })?;

        stored_count(count)
    }

    async fn reset_failures(&self, account: &str) -> Result<()> {
        sqlx::query(
            "UPDATE account_failures SET failed_attempts = 0, updated_at = $2 WHERE account = $1",
        )
        .bind(account)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            GuardError::StoreUnavailable(format!("Failed to reset failure counter: {e}"))
        })?;

        Ok(())
    }
}
