//! # Bulwark Guard
//!
//! Abuse prevention for unauthenticated auth endpoints: login, registration
//! and challenge (CAPTCHA) verification.
//!
//! ## Features
//!
//! - **Fixed-window rate limiting**: per `(subject, endpoint)`, atomic in the store
//! - **Adaptive challenges**: per-account failure counter with a threshold
//! - **Enumeration-safe responses**: one message per rejection kind
//! - **Failure direction**: the limiter fails open, the challenge gate fails closed
//! - **Testable**: in-memory store, mocks and injectable clocks
//!
//! ## Architecture
//!
//! Every attempt runs through a short-circuiting pipeline:
//!
//! ```text
//! RateLimiter → ChallengeGate → CredentialService → ChallengeGate update → Rejection | Granted
//! ```
//!
//! ## Example: Login
//!
//! ```rust,ignore
//! use bulwark_guard::*;
//! use bulwark_guard::policy::LoginAttempt;
//!
//! let store = stores::RedisStore::new("redis://127.0.0.1:6379").await?;
//! let policy = AuthAttemptPolicy::new(GuardEnvironment::new(
//!     store.clone(),
//!     store,
//!     my_credential_service,
//!     providers::SiteVerifyChallengeVerifier::hcaptcha(secret),
//! ));
//!
//! let subject = subject::subject_key(request.headers());
//! match policy.login(&LoginAttempt::new(subject, email, password)).await {
//!     Ok(granted) => issue_session(granted.account),
//!     Err(rejection) => render_error(rejection.message(), rejection.needs_challenge()),
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod gate;
pub mod limiter;
pub mod outcome;
pub mod policy;
pub mod providers;
pub mod stores;
pub mod subject;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::{ChallengeConfig, EndpointLimit, GuardConfig, RegistrationConfig};
pub use environment::GuardEnvironment;
pub use error::{GuardError, Result};
pub use gate::{ChallengeGate, GateState};
pub use limiter::{RateLimitResult, RateLimiter};
pub use outcome::{AttemptOutcome, Flow, Rejection, RejectionKind};
pub use policy::{AttemptResult, AuthAttemptPolicy};
