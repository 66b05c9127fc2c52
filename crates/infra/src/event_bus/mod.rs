//! Infrastructure event bus implementations.
//!
//! The bus abstraction lives in `dealership-events` as pure mechanics.
//! This module provides broker-backed implementations (Redis pub/sub).

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisPubSubEventBus};
