//! Guard providers.
//!
//! This module defines traits for every external dependency the guard
//! touches. These traits enable dependency injection and make the policy
//! testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. The limiter, gate and
//! policy depend on these traits; the host wires in concrete stores and
//! verification services.
//!
//! ```text
//!  request ──► RateLimiter ──► ChallengeGate ──► CredentialService
//!                  │                 │      ╲
//!                  ▼                 ▼       ╲──► ChallengeVerifier
//!            CounterStore       FailureStore
//! ```
//!
//! - **Testing**: use the in-memory store and the mocks (deterministic)
//! - **Production**: use `RedisStore`/`PostgresStore` and real verifiers

pub mod challenge;
pub mod counter_store;
pub mod credentials;
pub mod failure_store;
pub mod siteverify;

// Re-export provider traits
pub use challenge::ChallengeVerifier;
pub use counter_store::{CounterStore, WindowCount, WindowKey};
pub use credentials::{CredentialCause, CredentialCheck, CredentialService};
pub use failure_store::FailureStore;
pub use siteverify::SiteVerifyChallengeVerifier;
