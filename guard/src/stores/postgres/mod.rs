//! PostgreSQL storage implementations.
//!
//! This module provides durable counters using PostgreSQL for:
//! - Fixed-window rate limit counters
//! - Per-account failure counters

pub mod counters;

// Re-exports
pub use counters::PostgresStore;
