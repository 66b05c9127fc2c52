//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **fan-out bus pattern**: every message published to the
//! bus is copied to every live subscription, independent of any queue name or topic.
//!
//! ## Delivery Model
//!
//! The bus is deliberately **best-effort**:
//!
//! - **At-most-once**: a message is handed to the transport once; if the transport
//!   fails at send time the message is gone (no retry, no outbox)
//! - **No persistence**: subscribers that are offline when a message is published never see it
//! - **Per-publisher ordering only**: messages from one publisher arrive in publish order;
//!   nothing is promised across publishers
//!
//! Write paths never depend on the bus: the relational store is the source of truth and
//! the bus is a notification channel for downstream consumers.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a fan-out stream.
///
/// Each subscription receives a copy of every message published after it was created.
///
/// ```ignore
/// let sub = bus.subscribe();
/// loop {
///     match sub.recv_timeout(Duration::from_secs(1)) {
///         Ok(payload) => handle(payload),
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
///
/// Subscriptions are designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Transport-agnostic fan-out bus.
///
/// ## Error Handling
///
/// `publish()` can fail (broker unreachable, connection dropped). The error is returned
/// to the caller, which for this system is always the event publisher worker: it logs
/// and moves on. Nothing upstream of the publisher ever sees a bus error.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`. Implementations that wrap a single broker
/// connection serialize access to it internally.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
