//! Entity repositories: CRUD over the `dealers` and `cars` tables.
//!
//! The trait boundary lives in `trait.rs`; `postgres.rs` is the production store and
//! `in_memory.rs` mirrors its semantics (serial ids, foreign key, cascade) for tests/dev.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryCarRepository, InMemoryDealerRepository, InMemoryStore};
pub use postgres::{PostgresCarRepository, PostgresDealerRepository};
pub use r#trait::{CarRepository, DealerRepository, RepositoryError, RepositoryResult};
