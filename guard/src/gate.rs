//! Adaptive challenge gate.
//!
//! Tracks consecutive failed authentications per account. Once an account
//! reaches the threshold it is **elevated**: every further attempt must carry
//! a verified challenge token before credentials are checked. Only a
//! successful authentication clears it; there is no time decay.
//!
//! # Failure policy
//!
//! The gate **fails closed**. If the failure store cannot answer,
//! [`ChallengeGate::requires_challenge`] returns `true`.

use crate::config::GuardConfig;
use crate::error::{Result, bounded};
use crate::providers::FailureStore;
use serde::Serialize;
use std::time::Duration;

/// Per-account challenge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Below the threshold. No challenge needed.
    Clear,
    /// At or above the threshold. Challenge required.
    Elevated,
}

/// Per-account failure counter with a challenge threshold.
#[derive(Debug, Clone)]
pub struct ChallengeGate<F> {
    store: F,
    threshold: u32,
    store_timeout: Duration,
}

impl<F: FailureStore> ChallengeGate<F> {
    /// Create a gate with the default threshold and store timeout.
    #[must_use]
    pub fn new(store: F) -> Self {
        Self::from_config(store, &GuardConfig::default())
    }

    /// Create a gate using the threshold and timeout from `config`.
    #[must_use]
    pub const fn from_config(store: F, config: &GuardConfig) -> Self {
        Self {
            store,
            threshold: config.challenge.threshold,
            store_timeout: config.store_timeout(),
        }
    }

    /// Set the elevation threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the per-call store timeout.
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Elevation threshold.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Backing store.
    #[must_use]
    pub const fn store(&self) -> &F {
        &self.store
    }

    /// Whether the next attempt for `account` must carry a verified challenge.
    ///
    /// Returns `true` when the store is unavailable.
    pub async fn requires_challenge(&self, account: &str) -> bool {
        match bounded(self.store_timeout, self.store.failed_attempts(account)).await {
            Ok(count) => count >= self.threshold,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Failure store unavailable, challenge gate failing closed"
                );
                metrics::counter!("bulwark.challenge_gate.fail_closed").increment(1);
                true
            }
        }
    }

    /// Current state of `account`. Reads as elevated when the store is unavailable.
    pub async fn state(&self, account: &str) -> GateState {
        if self.requires_challenge(account).await {
            GateState::Elevated
        } else {
            GateState::Clear
        }
    }

    /// Record one failed authentication and return the new count.
    ///
    /// # Errors
    ///
    /// Returns a store failure if the increment could not be committed.
    pub async fn on_failure(&self, account: &str) -> Result<u32> {
        let count = bounded(self.store_timeout, self.store.increment_failures(account)).await?;

        if count == self.threshold {
            tracing::info!(
                failed_attempts = count,
                threshold = self.threshold,
                "Account elevated to challenge"
            );
        } else {
            tracing::debug!(failed_attempts = count, "Recorded failed authentication");
        }

        Ok(count)
    }

    /// Clear the failure count after a successful authentication.
    ///
    /// # Errors
    ///
    /// Returns a store failure if the reset could not be committed.
    pub async fn on_success(&self, account: &str) -> Result<()> {
        bounded(self.store_timeout, self.store.reset_failures(account)).await
    }
}
