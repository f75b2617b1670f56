//! Authentication attempt policy.
//!
//! Sequences the rate limiter, the challenge gate and the credential service
//! for each guarded flow, and decides what each attempt is allowed to reveal.
//!
//! # Pipeline
//!
//! ```text
//! login:     RateLimiter ─► ChallengeGate ─► (ChallengeVerifier) ─► CredentialService ─► gate update
//! register:  RateLimiter ─► (ChallengeVerifier) ─► validation ─► CredentialService ─► response floor
//! verify:    RateLimiter ─► ChallengeVerifier
//! ```
//!
//! Every stage short-circuits. A request rejected by the limiter never
//! reaches the failure store, the challenge verifier or the credential
//! service.
//!
//! # Security
//!
//! - Login answers "unknown account", "wrong password" and "unconfirmed
//!   account" with one message.
//! - Registration answers validation failures and duplicate accounts with
//!   one message, after the same minimum latency.
//! - Only failures of the credential check itself count toward elevation.
//!   Challenge rejections do not.

use crate::config::RegistrationConfig;
use crate::constants::endpoints;
use crate::environment::GuardEnvironment;
use crate::error::Result;
use crate::gate::ChallengeGate;
use crate::limiter::RateLimiter;
use crate::outcome::{AttemptOutcome, Flow, Rejection, RejectionKind};
use crate::providers::{ChallengeVerifier, CounterStore, CredentialService, FailureStore};
use crate::utils::{is_valid_email, normalize_account, password_within_bounds};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Result of a guarded attempt.
pub type AttemptResult<T> = std::result::Result<T, Rejection>;

/// A password login request.
#[derive(Clone, Deserialize)]
pub struct LoginAttempt {
    /// Opaque caller identity (see [`subject_key`](crate::subject::subject_key)).
    pub subject: String,

    /// Account identifier as typed.
    pub email: String,

    /// Password as typed.
    pub password: String,

    /// Challenge token from the client widget, if one was rendered.
    #[serde(default)]
    pub challenge_token: Option<String>,
}

impl LoginAttempt {
    /// Create a login attempt without a challenge token.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            password: password.into(),
            challenge_token: None,
        }
    }

    /// Attach a challenge token.
    #[must_use]
    pub fn with_challenge_token(mut self, token: impl Into<String>) -> Self {
        self.challenge_token = Some(token.into());
        self
    }
}

impl fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("subject", &self.subject)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("challenge_token", &self.challenge_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A successful login. Session issuance is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginGranted {
    /// Normalized account identifier.
    pub account: String,
}

/// An account registration request.
#[derive(Clone, Deserialize)]
pub struct RegistrationAttempt {
    /// Opaque caller identity.
    pub subject: String,

    /// Requested account identifier.
    pub email: String,

    /// Requested password.
    pub password: String,

    /// Password typed a second time.
    pub password_confirmation: String,

    /// Challenge token, required when registration challenges are enabled.
    #[serde(default)]
    pub challenge_token: Option<String>,
}

impl RegistrationAttempt {
    /// Create a registration attempt without a challenge token.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        password_confirmation: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            password: password.into(),
            password_confirmation: password_confirmation.into(),
            challenge_token: None,
        }
    }

    /// Attach a challenge token.
    #[must_use]
    pub fn with_challenge_token(mut self, token: impl Into<String>) -> Self {
        self.challenge_token = Some(token.into());
        self
    }
}

impl fmt::Debug for RegistrationAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationAttempt")
            .field("subject", &self.subject)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("password_confirmation", &"<redacted>")
            .field("challenge_token", &self.challenge_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// An accepted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationAccepted {
    /// Normalized account identifier.
    pub account: String,
}

/// Record an outcome in logs and metrics.
fn record(flow: Flow, outcome: &'static str) {
    tracing::info!(flow = flow.as_str(), outcome = outcome, "Attempt completed");
    metrics::counter!("bulwark.attempt", "flow" => flow.as_str(), "outcome" => outcome)
        .increment(1);
}

/// Build a rejection and record it.
fn reject(flow: Flow, kind: RejectionKind) -> Rejection {
    record(
        flow,
        kind.outcome().map_or(kind.as_str(), AttemptOutcome::as_str),
    );
    Rejection::new(flow, kind)
}

/// Orchestrates the guarded authentication flows.
///
/// # Example
///
/// ```
/// use bulwark_guard::mocks::{MockChallengeVerifier, MockCredentialService};
/// use bulwark_guard::policy::LoginAttempt;
/// use bulwark_guard::stores::MemoryStore;
/// use bulwark_guard::{AuthAttemptPolicy, GuardEnvironment};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let policy = AuthAttemptPolicy::new(GuardEnvironment::new(
///     store.clone(),
///     store,
///     MockCredentialService::new().with_account("alice@example.com", "correct horse"),
///     MockChallengeVerifier::new(),
/// ));
///
/// let granted = policy
///     .login(&LoginAttempt::new("203.0.113.7", "Alice@Example.com", "correct horse"))
///     .await
///     .unwrap();
/// assert_eq!(granted.account, "alice@example.com");
///
/// let rejected = policy
///     .login(&LoginAttempt::new("203.0.113.7", "alice@example.com", "wrong"))
///     .await
///     .unwrap_err();
/// assert_eq!(rejected.message(), "Incorrect email or password");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct AuthAttemptPolicy<S, F, C, V>
where
    S: CounterStore,
    F: FailureStore,
    C: CredentialService,
    V: ChallengeVerifier,
{
    limiter: RateLimiter<S>,
    gate: ChallengeGate<F>,
    credentials: C,
    challenges: V,
    registration: RegistrationConfig,
}

impl<S, F, C, V> AuthAttemptPolicy<S, F, C, V>
where
    S: CounterStore,
    F: FailureStore,
    C: CredentialService,
    V: ChallengeVerifier,
{
    /// Create a policy from its environment.
    ///
    /// The configuration is not rejected here; an invalid one is logged at
    /// `error`. Use [`try_new`](Self::try_new) to refuse it instead.
    #[must_use]
    pub fn new(env: GuardEnvironment<S, F, C, V>) -> Self {
        if let Err(error) = env.config.validate() {
            tracing::error!(error = %error, "Guard configuration failed validation");
        }
        Self::build(env)
    }

    /// Create a policy from its environment after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`](crate::GuardError::Configuration) if the configuration fails
    /// [`GuardConfig::validate`](crate::config::GuardConfig::validate).
    pub fn try_new(env: GuardEnvironment<S, F, C, V>) -> Result<Self> {
        env.config.validate()?;
        Ok(Self::build(env))
    }

    fn build(env: GuardEnvironment<S, F, C, V>) -> Self {
        let GuardEnvironment {
            counters,
            failures,
            credentials,
            challenges,
            config,
        } = env;

        Self {
            limiter: RateLimiter::from_config(counters, &config),
            gate: ChallengeGate::from_config(failures, &config),
            credentials,
            challenges,
            registration: config.registration,
        }
    }

    /// Rate limiter used by every flow.
    #[must_use]
    pub const fn limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    /// Challenge gate used by login.
    #[must_use]
    pub const fn gate(&self) -> &ChallengeGate<F> {
        &self.gate
    }

    /// Run a password login attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] of kind `RateLimited`, `ChallengeRequired`,
    /// `ChallengeFailed`, `InvalidCredentials` or `InternalError`.
    pub async fn login(&self, attempt: &LoginAttempt) -> AttemptResult<LoginGranted> {
        const FLOW: Flow = Flow::Login;

        if !self.limiter.check(&attempt.subject, endpoints::LOGIN).await.allowed {
            return Err(reject(FLOW, RejectionKind::RateLimited));
        }

        let account = normalize_account(&attempt.email);

        if self.gate.requires_challenge(&account).await {
            self.enforce_challenge(FLOW, attempt.challenge_token.as_deref())
                .await?;
        }

        tracing::debug!(
            flow = FLOW.as_str(),
            outcome = %AttemptOutcome::Allowed,
            "Attempt passed pre-checks"
        );

        let check = match self.credentials.verify(&account, &attempt.password).await {
            Ok(check) => check,
            Err(error) => {
                tracing::error!(
                    error = %error,
                    flow = FLOW.as_str(),
                    "Credential service failed"
                );
                return Err(reject(FLOW, RejectionKind::InternalError));
            }
        };

        if check.succeeded() {
            if let Err(error) = self.gate.on_success(&account).await {
                tracing::warn!(
                    error = %error,
                    "Failed to reset failure counter after successful login"
                );
            }
            record(FLOW, AttemptOutcome::Success.as_str());
            return Ok(LoginGranted { account });
        }

        tracing::debug!(cause = ?check.cause, "Credential check refused");

        if let Err(error) = self.gate.on_failure(&account).await {
            tracing::error!(error = %error, "Failed to record failed login");
        }

        Err(reject(FLOW, RejectionKind::InvalidCredentials))
    }

    /// Run an account registration attempt.
    ///
    /// Every outcome except `RateLimited` is returned no earlier than the
    /// configured response floor after the call started.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] of kind `RateLimited`, `ChallengeRequired`,
    /// `ChallengeFailed`, `InvalidCredentials` or `InternalError`.
    pub async fn register(
        &self,
        attempt: &RegistrationAttempt,
    ) -> AttemptResult<RegistrationAccepted> {
        let started = Instant::now();

        if !self.limiter.check(&attempt.subject, endpoints::REGISTER).await.allowed {
            return Err(reject(Flow::Registration, RejectionKind::RateLimited));
        }

        let result = self.register_unthrottled(attempt).await;

        tokio::time::sleep_until(started + self.registration.response_floor()).await;

        result
    }

    /// Verify a challenge token on the standalone verification endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] of kind `RateLimited` or `ChallengeFailed`.
    pub async fn verify_challenge(&self, subject: &str, token: &str) -> AttemptResult<()> {
        const FLOW: Flow = Flow::ChallengeVerify;

        if !self
            .limiter
            .check(subject, endpoints::CHALLENGE_VERIFY)
            .await
            .allowed
        {
            return Err(reject(FLOW, RejectionKind::RateLimited));
        }

        if self.challenges.verify_token(token).await {
            record(FLOW, AttemptOutcome::Success.as_str());
            Ok(())
        } else {
            Err(reject(FLOW, RejectionKind::ChallengeFailed))
        }
    }

    async fn register_unthrottled(
        &self,
        attempt: &RegistrationAttempt,
    ) -> AttemptResult<RegistrationAccepted> {
        const FLOW: Flow = Flow::Registration;

        if self.registration.require_challenge {
            self.enforce_challenge(FLOW, attempt.challenge_token.as_deref())
                .await?;
        }

        let account = normalize_account(&attempt.email);

        if let Some(reason) = self.validation_failure(&account, attempt) {
            tracing::debug!(reason = reason, "Registration details failed validation");
            return Err(reject(FLOW, RejectionKind::InvalidCredentials));
        }

        match self
            .credentials
            .create_account(&account, &attempt.password)
            .await
        {
            Ok(check) if check.succeeded() => {
                record(FLOW, AttemptOutcome::Success.as_str());
                Ok(RegistrationAccepted { account })
            }
            Ok(check) => {
                tracing::debug!(cause = ?check.cause, "Account creation refused");
                Err(reject(FLOW, RejectionKind::InvalidCredentials))
            }
            Err(error) => {
                tracing::error!(
                    error = %error,
                    flow = FLOW.as_str(),
                    "Credential service failed"
                );
                Err(reject(FLOW, RejectionKind::InternalError))
            }
        }
    }

    fn validation_failure(
        &self,
        account: &str,
        attempt: &RegistrationAttempt,
    ) -> Option<&'static str> {
        if !is_valid_email(account) {
            return Some("email_format");
        }

        if !password_within_bounds(
            &attempt.password,
            self.registration.min_password_len,
            self.registration.max_password_len,
        ) {
            return Some("password_length");
        }

        if attempt.password != attempt.password_confirmation {
            return Some("password_confirmation");
        }

        None
    }

    async fn enforce_challenge(&self, flow: Flow, token: Option<&str>) -> AttemptResult<()> {
        let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
            return Err(reject(flow, RejectionKind::ChallengeRequired));
        };

        if self.challenges.verify_token(token).await {
            Ok(())
        } else {
            Err(reject(flow, RejectionKind::ChallengeFailed))
        }
    }
}
