//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests.

pub mod challenge;
pub mod credentials;
pub mod store;

pub use challenge::MockChallengeVerifier;
pub use credentials::MockCredentialService;
pub use store::MockStore;
