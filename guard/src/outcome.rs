//! Attempt outcomes and the caller-visible rejection taxonomy.
//!
//! # Security
//!
//! Response text is a pure function of [`Flow`] and [`RejectionKind`].
//! [`Rejection`] keeps its fields private and is only built inside this
//! crate, so no collaborator detail (which account was missing, why a
//! credential failed) can be threaded into a message.

use serde::Serialize;
use std::fmt;

/// Generic throttling message. Carries no window or limit detail.
pub const THROTTLED_MESSAGE: &str = "Too many attempts. Please wait a while and try again.";

/// Message for an elevated account that did not present a challenge token.
pub const CHALLENGE_REQUIRED_MESSAGE: &str = "Please complete the security check to continue.";

/// Message for a challenge token that did not verify.
pub const CHALLENGE_FAILED_MESSAGE: &str = "The security check could not be verified. Please try again.";

/// The single login credential message, whatever the underlying cause.
pub const LOGIN_INVALID_MESSAGE: &str = "Incorrect email or password";

/// The single registration rejection message for validation and duplicate accounts.
pub const REGISTRATION_INVALID_MESSAGE: &str =
    "We couldn't create an account with those details. Please check them and try again.";

/// Message for infrastructure failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Result of one authentication attempt.
///
/// Recorded in logs and metrics. Never carries the reason behind
/// `CredentialsInvalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Passed the rate limiter and, when required, the challenge.
    Allowed,
    /// Rejected by the rate limiter.
    RateLimited,
    /// Elevated account presented no challenge token.
    ChallengeRequired,
    /// Challenge token failed verification.
    ChallengeFailed,
    /// Credential check failed, for any reason.
    CredentialsInvalid,
    /// Credential check succeeded.
    Success,
}

impl AttemptOutcome {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::RateLimited => "rate_limited",
            Self::ChallengeRequired => "challenge_required",
            Self::ChallengeFailed => "challenge_failed",
            Self::CredentialsInvalid => "credentials_invalid",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which guarded flow produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Password login.
    Login,
    /// Account registration.
    Registration,
    /// Standalone challenge verification.
    ChallengeVerify,
}

impl Flow {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Registration => "registration",
            Self::ChallengeVerify => "challenge_verify",
        }
    }
}

/// The five rejection kinds a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Too many requests for this subject and endpoint.
    RateLimited,
    /// A challenge token is needed before credentials are checked.
    ChallengeRequired,
    /// The supplied challenge token did not verify.
    ChallengeFailed,
    /// Credentials (or registration details) were not accepted.
    InvalidCredentials,
    /// Infrastructure failure.
    InternalError,
}

impl RejectionKind {
    /// Outcome recorded for this rejection.
    #[must_use]
    pub const fn outcome(self) -> Option<AttemptOutcome> {
        match self {
            Self::RateLimited => Some(AttemptOutcome::RateLimited),
            Self::ChallengeRequired => Some(AttemptOutcome::ChallengeRequired),
            Self::ChallengeFailed => Some(AttemptOutcome::ChallengeFailed),
            Self::InvalidCredentials => Some(AttemptOutcome::CredentialsInvalid),
            Self::InternalError => None,
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ChallengeRequired => "challenge_required",
            Self::ChallengeFailed => "challenge_failed",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InternalError => "internal_error",
        }
    }
}

/// Map a flow and rejection kind to the fixed user-facing message.
///
/// # Examples
///
/// ```
/// use bulwark_guard::outcome::{message_for, Flow, RejectionKind};
///
/// assert_eq!(
///     message_for(Flow::Login, RejectionKind::InvalidCredentials),
///     "Incorrect email or password",
/// );
/// ```
#[must_use]
pub const fn message_for(flow: Flow, kind: RejectionKind) -> &'static str {
    match kind {
        RejectionKind::RateLimited => THROTTLED_MESSAGE,
        RejectionKind::ChallengeRequired => CHALLENGE_REQUIRED_MESSAGE,
        RejectionKind::ChallengeFailed => CHALLENGE_FAILED_MESSAGE,
        RejectionKind::InvalidCredentials => match flow {
            Flow::Registration => REGISTRATION_INVALID_MESSAGE,
            Flow::Login | Flow::ChallengeVerify => LOGIN_INVALID_MESSAGE,
        },
        RejectionKind::InternalError => INTERNAL_ERROR_MESSAGE,
    }
}

/// A rejected attempt, as returned to request-handling code.
///
/// Only the kind and the flow are stored; the message is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rejection {
    flow: Flow,
    kind: RejectionKind,
}

impl Rejection {
    pub(crate) const fn new(flow: Flow, kind: RejectionKind) -> Self {
        Self { flow, kind }
    }

    /// Rejection kind.
    #[must_use]
    pub const fn kind(&self) -> RejectionKind {
        self.kind
    }

    /// Flow that produced the rejection.
    #[must_use]
    pub const fn flow(&self) -> Flow {
        self.flow
    }

    /// User-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        message_for(self.flow, self.kind)
    }

    /// Whether the caller should render a challenge widget next.
    #[must_use]
    pub const fn needs_challenge(&self) -> bool {
        matches!(
            self.kind,
            RejectionKind::ChallengeRequired | RejectionKind::ChallengeFailed
        )
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Rejection {}
