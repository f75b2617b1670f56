//! Per-account failure counter store trait.

use crate::constants::keys;
use crate::error::Result;

/// Per-account consecutive failure counter.
///
/// Counts are keyed by account identifier only, independent of the source
/// address. A missing record reads as zero.
///
/// # Security
///
/// `increment_failures` MUST be atomic: concurrent failed attempts against
/// the same account from different sources must each be counted.
pub trait FailureStore: Send + Sync {
    /// Current failure count for `account` (zero if never seen).
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn failed_attempts(
        &self,
        account: &str,
    ) -> impl std::future::Future<Output = Result<u32>> + Send;

    /// Atomically add one failure and return the new count.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn increment_failures(
        &self,
        account: &str,
    ) -> impl std::future::Future<Output = Result<u32>> + Send;

    /// Atomically reset the count to zero.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn reset_failures(
        &self,
        account: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Flat key for a failure counter in key-value stores.
#[must_use]
pub fn failure_key(account: &str) -> String {
    format!("{}{account}", keys::FAILURE_PREFIX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_key() {
        assert_eq!(failure_key("user@example.com"), "bulwark:fail:user@example.com");
    }
}
