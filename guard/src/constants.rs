//! Guard constants.
//!
//! This module contains the endpoint identifiers and defaults used
//! throughout the guard.

/// Endpoint identifiers used as the second half of a rate-limit key.
pub mod endpoints {
    /// Password login.
    pub const LOGIN: &str = "login";

    /// Account registration.
    pub const REGISTER: &str = "register";

    /// Standalone challenge (CAPTCHA) token verification.
    pub const CHALLENGE_VERIFY: &str = "challenge-verify";
}

/// Defaults matching the observed production policy.
pub mod defaults {
    /// Login attempts per window.
    pub const LOGIN_LIMIT: u32 = 10;

    /// Login window in seconds.
    pub const LOGIN_WINDOW_SECS: u64 = 900;

    /// Registration attempts per window.
    pub const REGISTER_LIMIT: u32 = 5;

    /// Registration window in seconds.
    pub const REGISTER_WINDOW_SECS: u64 = 3600;

    /// Challenge verifications per window.
    pub const CHALLENGE_VERIFY_LIMIT: u32 = 30;

    /// Challenge verification window in seconds.
    pub const CHALLENGE_VERIFY_WINDOW_SECS: u64 = 60;

    /// Consecutive failures after which an account must solve a challenge.
    pub const CHALLENGE_THRESHOLD: u32 = 3;

    /// Upper bound on a single store round-trip, in milliseconds.
    pub const STORE_TIMEOUT_MS: u64 = 250;

    /// Subject key used when no proxy header identifies the caller.
    pub const LOOPBACK_SUBJECT: &str = "127.0.0.1";
}

/// Key prefixes for shared stores.
pub mod keys {
    /// Prefix for fixed-window counters.
    pub const RATE_LIMIT_PREFIX: &str = "bulwark:rl:";

    /// Prefix for per-account failure counters.
    pub const FAILURE_PREFIX: &str = "bulwark:fail:";
}
