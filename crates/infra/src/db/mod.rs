//! Database layer: connection pool manager and schema bootstrap.
//!
//! Repositories live in `crate::repository`; this module only owns connections.

pub mod pool;
pub mod schema;

pub use pool::{PoolStats, create_pool, spawn_health_probe};
pub use schema::ensure_schema;
