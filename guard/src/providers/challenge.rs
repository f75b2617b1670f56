//! Challenge (CAPTCHA) token verification trait.
//!
//! # Security
//!
//! Verification is **fail closed**: an unreachable verifier, a malformed
//! reply or a transport error all mean "not verified". That is why the
//! method returns a plain `bool` rather than a `Result`.

/// Verifies a challenge token produced by a client-side widget.
pub trait ChallengeVerifier: Send + Sync {
    /// Return `true` only if `token` was verified as a solved challenge.
    fn verify_token(&self, token: &str) -> impl std::future::Future<Output = bool> + Send;
}
