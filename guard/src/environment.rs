//! Guard environment.
//!
//! This module defines the environment type for dependency injection
//! into [`AuthAttemptPolicy`](crate::policy::AuthAttemptPolicy).

use crate::config::GuardConfig;
use crate::providers::{ChallengeVerifier, CounterStore, CredentialService, FailureStore};

/// Guard environment.
///
/// Contains all external dependencies needed by the attempt policy.
///
/// # Type Parameters
///
/// - `S`: Counter store (fixed windows)
/// - `F`: Failure store (per-account failure counters)
/// - `C`: Credential service
/// - `V`: Challenge verifier
///
/// `S` and `F` are often the same store type, cloned.
#[derive(Debug, Clone)]
pub struct GuardEnvironment<S, F, C, V>
where
    S: CounterStore,
    F: FailureStore,
    C: CredentialService,
    V: ChallengeVerifier,
{
    /// Counter store backing the rate limiter.
    pub counters: S,

    /// Failure store backing the challenge gate.
    pub failures: F,

    /// Opaque password verification and account creation.
    pub credentials: C,

    /// Challenge token verification.
    pub challenges: V,

    /// Static configuration.
    pub config: GuardConfig,
}

impl<S, F, C, V> GuardEnvironment<S, F, C, V>
where
    S: CounterStore,
    F: FailureStore,
    C: CredentialService,
    V: ChallengeVerifier,
{
    /// Create a new guard environment with the default configuration.
    #[must_use]
    pub fn new(counters: S, failures: F, credentials: C, challenges: V) -> Self {
        Self {
            counters,
            failures,
            credentials,
            challenges,
            config: GuardConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }
}
