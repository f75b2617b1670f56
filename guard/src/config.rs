//! Guard configuration.
//!
//! All values are static and supplied by the host application at startup.
//! Every struct deserializes with `serde` (missing fields fall back to the
//! defaults below) and offers `with_*` builders for programmatic setup.

use crate::constants::{defaults, endpoints};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Fixed-window budget for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLimit {
    /// Endpoint identifier (e.g. `"login"`).
    pub endpoint: String,

    /// Requests allowed per window.
    pub limit: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl EndpointLimit {
    /// Create a new endpoint limit.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, limit: u32, window_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            limit,
            window_secs,
        }
    }

    /// Window length as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Default budget for one of the built-in endpoints.
    ///
    /// Returns `None` for endpoints the guard does not drive itself.
    #[must_use]
    pub fn builtin(endpoint: &str) -> Option<Self> {
        let (limit, window_secs) = match endpoint {
            endpoints::LOGIN => (defaults::LOGIN_LIMIT, defaults::LOGIN_WINDOW_SECS),
            endpoints::REGISTER => (defaults::REGISTER_LIMIT, defaults::REGISTER_WINDOW_SECS),
            endpoints::CHALLENGE_VERIFY => (
                defaults::CHALLENGE_VERIFY_LIMIT,
                defaults::CHALLENGE_VERIFY_WINDOW_SECS,
            ),
            _ => return None,
        };
        Some(Self::new(endpoint, limit, window_secs))
    }
}

/// Endpoints every configuration must budget.
const BUILTIN_ENDPOINTS: [&str; 3] = [
    endpoints::LOGIN,
    endpoints::REGISTER,
    endpoints::CHALLENGE_VERIFY,
];

/// Deserialize an endpoint table, keeping the built-in budgets for any
/// endpoint the document does not list.
fn merge_over_builtin<'de, D>(deserializer: D) -> std::result::Result<Vec<EndpointLimit>, D::Error>
where
    D: Deserializer<'de>,
{
    let listed = Vec::<EndpointLimit>::deserialize(deserializer)?;
    let mut merged: Vec<EndpointLimit> = BUILTIN_ENDPOINTS
        .iter()
        .filter(|builtin| !listed.iter().any(|limit| limit.endpoint == **builtin))
        .filter_map(|builtin| EndpointLimit::builtin(builtin))
        .collect();
    merged.extend(listed);
    Ok(merged)
}

/// Adaptive challenge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Failed attempts at which an account becomes elevated.
    ///
    /// Default: 3
    pub threshold: u32,
}

impl ChallengeConfig {
    /// Set the elevation threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::CHALLENGE_THRESHOLD,
        }
    }
}

/// Registration flow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Minimum password length in characters.
    ///
    /// Default: 8
    pub min_password_len: usize,

    /// Maximum password length in characters.
    ///
    /// Default: 128
    pub max_password_len: usize,

    /// Minimum wall time for any non-throttled registration response, in milliseconds.
    ///
    /// Default: 300
    pub response_floor_ms: u64,

    /// Require a verified challenge token on every registration.
    ///
    /// Default: false
    pub require_challenge: bool,
}

impl RegistrationConfig {
    /// Set password length bounds.
    #[must_use]
    pub const fn with_password_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_password_len = min;
        self.max_password_len = max;
        self
    }

    /// Set the response floor.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Floors are well below u64::MAX millis
    pub const fn with_response_floor(mut self, floor: Duration) -> Self {
        self.response_floor_ms = floor.as_millis() as u64;
        self
    }

    /// Require a challenge token on every registration.
    #[must_use]
    pub const fn with_required_challenge(mut self, required: bool) -> Self {
        self.require_challenge = required;
        self
    }

    /// Response floor as a [`Duration`].
    #[must_use]
    pub const fn response_floor(&self) -> Duration {
        Duration::from_millis(self.response_floor_ms)
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            min_password_len: 8,
            max_password_len: 128,
            response_floor_ms: 300,
            require_challenge: false,
        }
    }
}

/// Top-level guard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Per-endpoint fixed-window budgets.
    ///
    /// When deserialized, listed entries replace the built-in budget for the
    /// same endpoint and unlisted built-in endpoints keep their defaults.
    #[serde(deserialize_with = "merge_over_builtin")]
    pub endpoints: Vec<EndpointLimit>,

    /// Adaptive challenge settings.
    pub challenge: ChallengeConfig,

    /// Registration settings.
    pub registration: RegistrationConfig,

    /// Upper bound on one store round-trip, in milliseconds.
    ///
    /// Default: 250
    pub store_timeout_ms: u64,
}

impl GuardConfig {
    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`] if the document is malformed or
    /// fails [`GuardConfig::validate`].
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| GuardError::Configuration(format!("Invalid guard config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace or add the budget for one endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, limit: EndpointLimit) -> Self {
        self.endpoints.retain(|existing| existing.endpoint != limit.endpoint);
        self.endpoints.push(limit);
        self
    }

    /// Set challenge configuration.
    #[must_use]
    pub const fn with_challenge(mut self, challenge: ChallengeConfig) -> Self {
        self.challenge = challenge;
        self
    }

    /// Set registration configuration.
    #[must_use]
    pub const fn with_registration(mut self, registration: RegistrationConfig) -> Self {
        self.registration = registration;
        self
    }

    /// Set the store timeout.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Timeouts are well below u64::MAX millis
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Store timeout as a [`Duration`].
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Look up the budget for `endpoint`.
    #[must_use]
    pub fn limit_for(&self, endpoint: &str) -> Option<&EndpointLimit> {
        self.endpoints.iter().find(|limit| limit.endpoint == endpoint)
    }

    /// Check invariants the guard relies on.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`] if an endpoint is listed twice
    /// or has a zero-length window, a built-in endpoint has no budget, the
    /// challenge threshold is zero, the password bounds are inverted, or the
    /// store timeout is zero.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for limit in &self.endpoints {
            if !seen.insert(limit.endpoint.as_str()) {
                return Err(GuardError::Configuration(format!(
                    "Endpoint '{}' configured twice",
                    limit.endpoint
                )));
            }
            if limit.window_secs == 0 {
                return Err(GuardError::Configuration(format!(
                    "Endpoint '{}' has a zero-length window",
                    limit.endpoint
                )));
            }
        }

        if let Some(missing) = BUILTIN_ENDPOINTS
            .iter()
            .find(|endpoint| !seen.contains(**endpoint))
        {
            return Err(GuardError::Configuration(format!(
                "No rate limit configured for endpoint '{missing}'"
            )));
        }

        if self.challenge.threshold == 0 {
            return Err(GuardError::Configuration(
                "Challenge threshold must be at least 1".to_string(),
            ));
        }

        if self.registration.min_password_len > self.registration.max_password_len {
            return Err(GuardError::Configuration(
                "Minimum password length exceeds maximum".to_string(),
            ));
        }

        if self.store_timeout_ms == 0 {
            return Err(GuardError::Configuration(
                "Store timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            endpoints: BUILTIN_ENDPOINTS
                .iter()
                .filter_map(|endpoint| EndpointLimit::builtin(endpoint))
                .collect(),
            challenge: ChallengeConfig::default(),
            registration: RegistrationConfig::default(),
            store_timeout_ms: defaults::STORE_TIMEOUT_MS,
        }
    }
}
