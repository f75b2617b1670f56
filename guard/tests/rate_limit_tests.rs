//! Rate limiter and challenge gate integration tests.
//!
//! Covers the fixed-window contract under concurrency and simulated time,
//! the fail-open and fail-closed directions, and cancellation mid-pipeline.

#![allow(clippy::unwrap_used)]

use bulwark_core::environment::Clock;
use bulwark_guard::mocks::{MockChallengeVerifier, MockCredentialService, MockStore};
use bulwark_guard::policy::LoginAttempt;
use bulwark_guard::providers::{FailureStore, WindowKey};
use bulwark_guard::stores::MemoryStore;
use bulwark_guard::{
    AuthAttemptPolicy, ChallengeConfig, ChallengeGate, EndpointLimit, GateState, GuardConfig,
    GuardEnvironment, RateLimiter, RejectionKind,
};
use bulwark_testing::{ManualClock, test_clock};
use std::sync::Arc;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(900);

/// Fifty concurrent requests against a limit of ten: exactly ten pass.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_requests_never_exceed_limit() {
    let store = MemoryStore::new();
    let limiter = Arc::new(RateLimiter::new(store.clone()));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.allow("203.0.113.9", "login", 10, WINDOW).await })
        })
        .collect();

    let mut allowed = 0;
    let mut denied = 0;
    for handle in handles {
        if handle.await.unwrap().allowed {
            allowed += 1;
        } else {
            denied += 1;
        }
    }

    assert_eq!(allowed, 10);
    assert_eq!(denied, 40);
    assert_eq!(store.window_count(&WindowKey::new("203.0.113.9", "login")), 50);
}

/// Ten at t=0 pass, the eleventh at t=1s is denied, the twelfth at
/// t=901s opens a new window.
#[tokio::test]
async fn test_fixed_window_boundary_through_limiter() {
    let clock = ManualClock::starting_at(test_clock().now());
    let limiter = RateLimiter::new(MemoryStore::with_clock(clock.clone()));

    for _ in 0..10 {
        assert!(limiter.allow("203.0.113.9", "login", 10, WINDOW).await.allowed);
    }

    clock.advance(chrono::Duration::seconds(1));
    assert!(!limiter.allow("203.0.113.9", "login", 10, WINDOW).await.allowed);

    clock.advance(chrono::Duration::seconds(900));
    assert!(limiter.allow("203.0.113.9", "login", 10, WINDOW).await.allowed);
    assert!(limiter.allow("203.0.113.9", "login", 10, WINDOW).await.allowed);
}

/// A counter store outage lets login traffic through.
#[tokio::test]
async fn test_login_fails_open_on_counter_outage() {
    let counters = MockStore::new();
    counters.set_unavailable(true);
    let policy = AuthAttemptPolicy::new(GuardEnvironment::new(
        counters.clone(),
        MockStore::new(),
        MockCredentialService::new().with_account("alice@example.com", "correct horse"),
        MockChallengeVerifier::new(),
    ));

    for _ in 0..15 {
        policy
            .login(&LoginAttempt::new("203.0.113.9", "alice@example.com", "correct horse"))
            .await
            .unwrap();
    }
    assert_eq!(counters.window_calls(), 15);
}

/// A failure store outage demands a challenge from everyone.
#[tokio::test]
async fn test_login_fails_closed_on_failure_store_outage() {
    let failures = MockStore::new();
    failures.set_unavailable(true);
    let credentials = MockCredentialService::new().with_account("alice@example.com", "correct horse");
    let policy = AuthAttemptPolicy::new(GuardEnvironment::new(
        MockStore::new(),
        failures,
        credentials.clone(),
        MockChallengeVerifier::new(),
    ));

    let rejection = policy
        .login(&LoginAttempt::new("203.0.113.9", "alice@example.com", "correct horse"))
        .await
        .unwrap_err();

    assert_eq!(rejection.kind(), RejectionKind::ChallengeRequired);
    assert_eq!(credentials.verify_calls(), 0);
}

/// Elevation is monotonic until a success.
#[tokio::test]
async fn test_gate_monotonicity() {
    let gate = ChallengeGate::new(MemoryStore::new());
    let account = "target@example.com";

    for _ in 0..3 {
        gate.on_failure(account).await.unwrap();
    }
    assert!(gate.requires_challenge(account).await);

    for _ in 0..5 {
        gate.on_failure(account).await.unwrap();
        assert_eq!(gate.state(account).await, GateState::Elevated);
    }

    gate.on_success(account).await.unwrap();
    assert!(!gate.requires_challenge(account).await);
}

/// Concurrent failed logins from many sources are all counted.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failed_logins_are_all_counted() {
    let store = MockStore::new();
    let config = GuardConfig::default()
        .with_endpoint(EndpointLimit::new("login", 1000, 900))
        .with_challenge(ChallengeConfig::default().with_threshold(1000));
    let policy = Arc::new(AuthAttemptPolicy::new(
        GuardEnvironment::new(
            store.clone(),
            store.clone(),
            MockCredentialService::new().with_account("alice@example.com", "correct horse"),
            MockChallengeVerifier::new(),
        )
        .with_config(config),
    ));

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let policy = Arc::clone(&policy);
            tokio::spawn(async move {
                policy
                    .login(&LoginAttempt::new(format!("10.0.0.{i}"), "alice@example.com", "wrong"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }

    assert_eq!(store.failed_attempts("alice@example.com").await.unwrap(), 40);
}

/// Dropping a login while it waits on the credential service keeps the
/// committed rate count and leaves the failure counter untouched.
#[tokio::test(start_paused = true)]
async fn test_cancellation_is_idempotent_forward() {
    let store = MockStore::new();
    let credentials = MockCredentialService::new().with_account("alice@example.com", "correct horse");
    credentials.set_hanging(true);
    let policy = AuthAttemptPolicy::new(GuardEnvironment::new(
        store.clone(),
        store.clone(),
        credentials.clone(),
        MockChallengeVerifier::new(),
    ));

    let attempt = LoginAttempt::new("203.0.113.9", "alice@example.com", "wrong");
    let result = tokio::time::timeout(Duration::from_secs(1), policy.login(&attempt)).await;

    assert!(result.is_err(), "login should still be waiting on credentials");
    assert_eq!(credentials.verify_calls(), 1);
    assert_eq!(
        store.memory().window_count(&WindowKey::new("203.0.113.9", "login")),
        1
    );
    assert_eq!(store.failure_increments(), 0);
    assert_eq!(store.failed_attempts("alice@example.com").await.unwrap(), 0);
}
