//! Siteverify-style challenge verifier.
//!
//! hCaptcha, reCAPTCHA and Cloudflare Turnstile all expose the same shape of
//! API: a form POST of `secret` and `response` answered by JSON containing a
//! `success` boolean. This verifier speaks that protocol.

use crate::providers::ChallengeVerifier;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// hCaptcha verification endpoint.
pub const HCAPTCHA_SITEVERIFY_URL: &str = "https://api.hcaptcha.com/siteverify";

/// Google reCAPTCHA verification endpoint.
pub const RECAPTCHA_SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Cloudflare Turnstile verification endpoint.
pub const TURNSTILE_SITEVERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Challenge verifier backed by a siteverify HTTP endpoint.
///
/// Fails closed: any transport error, non-2xx status or unparseable body is
/// treated as an unverified token.
///
/// # Example
///
/// ```no_run
/// use bulwark_guard::providers::SiteVerifyChallengeVerifier;
///
/// let verifier = SiteVerifyChallengeVerifier::hcaptcha(
///     std::env::var("HCAPTCHA_SECRET").unwrap_or_default(),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct SiteVerifyChallengeVerifier {
    /// Verification endpoint URL.
    endpoint: String,

    /// Server-side secret (keep confidential).
    secret: String,

    /// HTTP client for making requests.
    http_client: Client,

    /// Per-request timeout.
    ///
    /// Default: 3 seconds
    timeout: Duration,
}

/// Subset of the siteverify reply the guard relies on.
#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl SiteVerifyChallengeVerifier {
    /// Create a verifier for an arbitrary siteverify endpoint.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Verification URL
    /// * `secret` - Server-side secret issued by the CAPTCHA provider
    #[must_use]
    pub fn new(endpoint: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: secret.into(),
            http_client: Client::new(),
            timeout: Duration::from_secs(3),
        }
    }

    /// Verifier for hCaptcha.
    #[must_use]
    pub fn hcaptcha(secret: impl Into<String>) -> Self {
        Self::new(HCAPTCHA_SITEVERIFY_URL, secret)
    }

    /// Verifier for Google reCAPTCHA.
    #[must_use]
    pub fn recaptcha(secret: impl Into<String>) -> Self {
        Self::new(RECAPTCHA_SITEVERIFY_URL, secret)
    }

    /// Verifier for Cloudflare Turnstile.
    #[must_use]
    pub fn turnstile(secret: impl Into<String>) -> Self {
        Self::new(TURNSTILE_SITEVERIFY_URL, secret)
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint this verifier calls.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChallengeVerifier for SiteVerifyChallengeVerifier {
    async fn verify_token(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }

        let params = [("secret", self.secret.as_str()), ("response", token)];

        let response = match self
            .http_client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .form(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    endpoint = %self.endpoint,
                    "Challenge verification request failed (fail closed)"
                );
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                endpoint = %self.endpoint,
                "Challenge verification returned non-success status (fail closed)"
            );
            return false;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => {
                if !body.success {
                    tracing::debug!(
                        error_codes = ?body.error_codes,
                        "Challenge token rejected by provider"
                    );
                }
                body.success
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Challenge verification body unparseable (fail closed)"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_endpoints() {
        assert_eq!(
            SiteVerifyChallengeVerifier::hcaptcha("s").endpoint(),
            HCAPTCHA_SITEVERIFY_URL
        );
        assert_eq!(
            SiteVerifyChallengeVerifier::recaptcha("s").endpoint(),
            RECAPTCHA_SITEVERIFY_URL
        );
        assert_eq!(
            SiteVerifyChallengeVerifier::turnstile("s").endpoint(),
            TURNSTILE_SITEVERIFY_URL
        );
    }

    #[test]
    fn test_response_parsing() {
        let ok: SiteVerifyResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.success);
        assert!(ok.error_codes.is_empty());

        let rejected: SiteVerifyResponse = serde_json::from_str(
            r#"{"success": false, "error-codes": ["invalid-input-response"]}"#,
        )
        .unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.error_codes, vec!["invalid-input-response"]);
    }

    #[tokio::test]
    async fn test_blank_token_is_rejected_without_network() {
        let verifier = SiteVerifyChallengeVerifier::new("http://127.0.0.1:1/siteverify", "secret");
        assert!(!verifier.verify_token("   ").await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_closed() {
        let verifier = SiteVerifyChallengeVerifier::new("http://127.0.0.1:1/siteverify", "secret")
            .with_timeout(Duration::from_millis(500));
        assert!(!verifier.verify_token("some-token").await);
    }
}
