//! Mock credential service for testing.

use crate::error::{GuardError, Result};
use crate::providers::{CredentialCause, CredentialCheck, CredentialService};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct MockAccount {
    password: String,
    confirmed: bool,
}

/// In-memory credential service.
///
/// Passwords are compared in plain text. Accounts created through
/// `create_account` start unconfirmed.
#[derive(Debug, Clone, Default)]
pub struct MockCredentialService {
    accounts: Arc<Mutex<HashMap<String, MockAccount>>>,
    verify_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    hanging: Arc<AtomicBool>,
}

impl MockCredentialService {
    /// Create an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a confirmed account.
    #[must_use]
    pub fn with_account(self, identity: &str, password: &str) -> Self {
        self.insert(identity, password, true);
        self
    }

    /// Add an account that has not been confirmed yet.
    #[must_use]
    pub fn with_unconfirmed_account(self, identity: &str, password: &str) -> Self {
        self.insert(identity, password, false);
        self
    }

    /// Make every call return [`GuardError::VerifierUnavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every call wait forever.
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    /// Number of `verify` calls.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of `create_account` calls.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Whether an account exists for `identity`.
    #[must_use]
    pub fn has_account(&self, identity: &str) -> bool {
        self.accounts
            .lock()
            .map(|accounts| accounts.contains_key(identity))
            .unwrap_or(false)
    }

    fn insert(&self, identity: &str, password: &str, confirmed: bool) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                identity.to_string(),
                MockAccount {
                    password: password.to_string(),
                    confirmed,
                },
            );
        }
    }

    async fn admit(&self) -> Result<()> {
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(GuardError::VerifierUnavailable(
                "Mock credential service offline".into(),
            ));
        }

        Ok(())
    }
}

impl CredentialService for MockCredentialService {
    async fn verify(&self, identity: &str, secret: &str) -> Result<CredentialCheck> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.admit().await?;

        let accounts = self
            .accounts
            .lock()
            .map_err(|_| GuardError::VerifierUnavailable("Mutex lock failed".into()))?;

        let check = match accounts.get(identity) {
            None => CredentialCheck::rejected(CredentialCause::NotFound),
            Some(account) if account.password != secret => {
                CredentialCheck::rejected(CredentialCause::BadSecret)
            }
            Some(account) if !account.confirmed => {
                CredentialCheck::rejected(CredentialCause::Unconfirmed)
            }
            Some(_) => CredentialCheck::accepted(),
        };

        Ok(check)
    }

    async fn create_account(&self, identity: &str, secret: &str) -> Result<CredentialCheck> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.admit().await?;

        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| GuardError::VerifierUnavailable("Mutex lock failed".into()))?;

        if accounts.contains_key(identity) {
            return Ok(CredentialCheck::rejected(CredentialCause::DuplicateOnCreate));
        }

        accounts.insert(
            identity.to_string(),
            MockAccount {
                password: secret.to_string(),
                confirmed: false,
            },
        );

        Ok(CredentialCheck::accepted())
    }
}
