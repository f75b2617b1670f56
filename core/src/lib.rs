//! # Bulwark Core
//!
//! Shared abstractions for the Bulwark abuse-prevention crates.
//!
//! Everything that touches wall-clock time goes through [`environment::Clock`]
//! so that window arithmetic can be driven deterministically from tests.

/// Environment module - injected dependencies.
///
/// Stores and limiters never call `Utc::now()` directly; they receive a
/// [`Clock`](environment::Clock) instead.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            (**self).now()
        }
    }
}

pub use environment::{Clock, SystemClock};
