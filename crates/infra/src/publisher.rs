//! Fire-and-forget car event publisher.
//!
//! Request paths hand events to [`EventPublisher::publish`], which serializes on the
//! caller's side and enqueues the payload for a dedicated worker thread. The worker owns
//! the bus and is the only thing that ever talks to the broker, so a slow or dead broker
//! never delays a response and a dropped request future never cancels a publish.
//!
//! Delivery is at-most-once: a transport failure is logged, counted and forgotten.
//!
//! ## Backpressure
//!
//! The queue is bounded. When the broker falls behind and the queue is full, new events
//! are dropped and counted as failed instead of accumulating. [`EventPublisher::shutdown`]
//! waits at most the configured drain timeout for the backlog; whatever is left after
//! that is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use dealership_events::{Event, EventBus, encode};

use crate::config::PublisherSettings;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("publish queue full; event dropped")]
    QueueFull,
    #[error("publisher is shut down")]
    Closed,
    #[error("failed to start publisher worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Point-in-time publisher counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PublisherStats {
    pub published: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Shared {
    published: AtomicU64,
    failed: AtomicU64,
    /// Set when shutdown gives up on the backlog; the worker discards the rest.
    abandoned: AtomicBool,
}

struct Outgoing {
    event_type: &'static str,
    payload: String,
}

#[derive(Debug)]
struct Worker {
    handle: JoinHandle<()>,
    finished: mpsc::Receiver<()>,
}

#[derive(Debug)]
pub struct EventPublisher {
    sender: Mutex<Option<mpsc::SyncSender<Outgoing>>>,
    worker: Mutex<Option<Worker>>,
    shared: Arc<Shared>,
    drain_timeout: Duration,
}

impl EventPublisher {
    /// Start the worker thread that owns `bus`, with default queue bounds.
    pub fn spawn<B>(bus: B) -> Result<Self, PublishError>
    where
        B: EventBus<String> + 'static,
    {
        Self::with_settings(bus, &PublisherSettings::default())
    }

    pub fn with_settings<B>(bus: B, settings: &PublisherSettings) -> Result<Self, PublishError>
    where
        B: EventBus<String> + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<Outgoing>(settings.queue_capacity.max(1));
        let (finished_tx, finished) = mpsc::channel::<()>();
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();

        let handle = thread::Builder::new()
            .name("event-publisher".to_string())
            .spawn(move || {
                for out in rx {
                    if worker_shared.abandoned.load(Ordering::Relaxed) {
                        worker_shared.failed.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    match bus.publish(out.payload) {
                        Ok(()) => {
                            worker_shared.published.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(event_type = out.event_type, "event published");
                        }
                        Err(e) => {
                            worker_shared.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(event_type = out.event_type, error = %e, "event publish failed");
                        }
                    }
                }
                let _ = finished_tx.send(());
                tracing::debug!("event publisher worker stopped");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(Worker { handle, finished })),
            shared,
            drain_timeout: settings.drain_timeout,
        })
    }

    /// Serialize `event` and queue it for the worker. Never blocks.
    ///
    /// A full queue drops the event with [`PublishError::QueueFull`].
    pub fn publish<E: Event>(&self, event: &E) -> Result<(), PublishError> {
        let payload = encode(event).inspect_err(|_| {
            self.shared.failed.fetch_add(1, Ordering::Relaxed);
        })?;

        let guard = self.sender.lock().map_err(|_| PublishError::Closed)?;
        let sender = guard.as_ref().ok_or(PublishError::Closed)?;
        match sender.try_send(Outgoing {
            event_type: event.event_type(),
            payload,
        }) {
            Ok(()) => Ok(()),
            Err(mpsc::TrySendError::Full(_)) => {
                self.shared.failed.fetch_add(1, Ordering::Relaxed);
                Err(PublishError::QueueFull)
            }
            Err(mpsc::TrySendError::Disconnected(_)) => Err(PublishError::Closed),
        }
    }

    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            published: self.shared.published.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting events and wait up to the drain timeout for the backlog.
    ///
    /// Blocks the calling thread; from async code run it on a blocking task. If the
    /// backlog outlives the timeout the worker is told to discard it and is detached.
    /// Idempotent. Later `publish` calls fail with [`PublishError::Closed`].
    pub fn shutdown(&self) {
        self.close();
        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };
        let Some(worker) = worker else {
            return;
        };

        match worker.finished.recv_timeout(self.drain_timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    tracing::error!("event publisher worker panicked");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.shared.abandoned.store(true, Ordering::Relaxed);
                tracing::warn!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    "event backlog not drained in time; discarding the rest"
                );
            }
        }
    }

    fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

/// Dropping without [`EventPublisher::shutdown`] closes the queue and detaches the
/// worker: the backlog keeps draining in the background and nothing is joined.
impl Drop for EventPublisher {
    fn drop(&mut self) {
        self.close();
    }
}
