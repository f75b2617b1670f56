//! Credential verification service trait.
//!
//! The password engine is opaque to the guard. It answers "ok or not" plus
//! a cause the guard uses for logging only; the cause never reaches a
//! response.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Why a credential operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialCause {
    /// No failure.
    None,
    /// No such account.
    NotFound,
    /// Wrong password.
    BadSecret,
    /// Account exists but is not confirmed.
    Unconfirmed,
    /// Account already exists (registration only).
    DuplicateOnCreate,
}

/// Answer from the credential service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialCheck {
    /// Whether the operation succeeded.
    pub ok: bool,

    /// Failure cause, `None` on success.
    pub cause: CredentialCause,
}

impl CredentialCheck {
    /// Successful check.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            ok: true,
            cause: CredentialCause::None,
        }
    }

    /// Refused check with a cause.
    #[must_use]
    pub const fn rejected(cause: CredentialCause) -> Self {
        Self { ok: false, cause }
    }

    /// `true` only when `ok` is set and no cause is reported.
    ///
    /// A service that answers `ok = true` with a failure cause is treated as
    /// a refusal.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.ok && matches!(self.cause, CredentialCause::None)
    }
}

/// Opaque password verification and account creation service.
pub trait CredentialService: Send + Sync {
    /// Verify `secret` for `identity`.
    ///
    /// # Errors
    ///
    /// Returns error only on infrastructure failure; a wrong password is an
    /// `Ok` with `ok = false`.
    fn verify(
        &self,
        identity: &str,
        secret: &str,
    ) -> impl std::future::Future<Output = Result<CredentialCheck>> + Send;

    /// Create an account for `identity` with `secret`.
    ///
    /// # Errors
    ///
    /// Returns error only on infrastructure failure; an existing account is
    /// an `Ok` with cause [`CredentialCause::DuplicateOnCreate`].
    fn create_account(
        &self,
        identity: &str,
        secret: &str,
    ) -> impl std::future::Future<Output = Result<CredentialCheck>> + Send;
}
