//! Counter store implementations.
//!
//! Every store implements both [`CounterStore`](crate::providers::CounterStore)
//! and [`FailureStore`](crate::providers::FailureStore):
//!
//! - **Memory Store** (`DashMap`) - Single-instance deployments and tests
//! - **Redis Store** - Shared fixed windows via a server-side Lua script
//! - **PostgreSQL Store** (feature `postgres`) - Shared counters via conditional upsert

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod redis;

// Re-exports
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use redis::RedisStore;
