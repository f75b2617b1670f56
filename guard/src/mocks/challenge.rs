//! Mock challenge verifier for testing.

use crate::providers::ChallengeVerifier;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Verifier that accepts a fixed set of tokens.
#[derive(Debug, Clone, Default)]
pub struct MockChallengeVerifier {
    accepted: Arc<HashSet<String>>,
    calls: Arc<AtomicUsize>,
}

impl MockChallengeVerifier {
    /// Verifier that rejects every token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier that accepts exactly `tokens`.
    #[must_use]
    pub fn accepting<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            accepted: Arc::new(tokens.into_iter().map(Into::into).collect()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `verify_token` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChallengeVerifier for MockChallengeVerifier {
    async fn verify_token(&self, token: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accepted.contains(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_only_known_tokens() {
        let verifier = MockChallengeVerifier::accepting(["solved"]);

        assert!(verifier.verify_token("solved").await);
        assert!(!verifier.verify_token("forged").await);
        assert!(!MockChallengeVerifier::new().verify_token("solved").await);
        assert_eq!(verifier.calls(), 2);
    }
}
