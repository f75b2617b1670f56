//! Error types for infrastructure failures inside the guard.
//!
//! These never reach an end user. The policy layer folds them into a
//! [`Rejection`](crate::outcome::Rejection) after deciding whether to fail
//! open or fail closed.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Infrastructure failures raised by stores and collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    // ═══════════════════════════════════════════════════════════
    // Store Errors
    // ═══════════════════════════════════════════════════════════

    /// Counter store could not be reached or rejected the operation.
    #[error("Counter store unavailable: {0}")]
    StoreUnavailable(String),

    /// Counter store did not answer within the configured bound.
    #[error("Counter store timed out")]
    StoreTimeout,

    // ═══════════════════════════════════════════════════════════
    // Collaborator Errors
    // ═══════════════════════════════════════════════════════════

    /// Credential or challenge verification service failed.
    #[error("Verification service unavailable: {0}")]
    VerifierUnavailable(String),

    // ═══════════════════════════════════════════════════════════
    // Setup Errors
    // ═══════════════════════════════════════════════════════════

    /// Invalid configuration or store setup.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GuardError {
    /// Returns `true` if this error means the backing store could not answer.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bulwark_guard::GuardError;
    /// assert!(GuardError::StoreTimeout.is_store_failure());
    /// assert!(!GuardError::VerifierUnavailable("dns".into()).is_store_failure());
    /// ```
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout)
    }
}

/// Await a store operation for at most `limit`.
///
/// An elapsed deadline becomes [`GuardError::StoreTimeout`]; the inner
/// future is dropped at that point.
pub(crate) async fn bounded<T>(
    limit: Duration,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, operation)
        .await
        .unwrap_or(Err(GuardError::StoreTimeout))
}
