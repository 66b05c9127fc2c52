//! Redis pub/sub-backed fan-out exchange.
//!
//! Every client subscribed to the channel receives its own copy of each payload,
//! which is the fanout-exchange contract downstream consumers rely on. Redis pub/sub
//! is not durable: subscribers that are offline when a message is published never
//! see it.

use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::Duration;

use redis::Commands;
use thiserror::Error;

use dealership_events::{EventBus, Subscription};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RedisBusError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("redis connection lock poisoned")]
    Poisoned,
}

/// Redis pub/sub bus for pre-serialized JSON payloads.
///
/// Holds one publishing connection. A failed publish drops it and the next publish
/// reconnects, so a broker restart costs the messages sent while it was down and
/// nothing more.
pub struct RedisPubSubEventBus {
    client: redis::Client,
    channel: String,
    conn: Mutex<Option<redis::Connection>>,
}

impl RedisPubSubEventBus {
    /// Open the client and verify the broker answers `PING`.
    pub fn connect(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())?;
        let mut conn = open_connection(&client)?;
        redis::cmd("PING").query::<String>(&mut conn)?;

        let channel = channel.into();
        tracing::info!(channel = %channel, "connected to redis event exchange");
        Ok(Self {
            client,
            channel,
            conn: Mutex::new(Some(conn)),
        })
    }
}

impl std::fmt::Debug for RedisPubSubEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPubSubEventBus")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

fn open_connection(client: &redis::Client) -> Result<redis::Connection, redis::RedisError> {
    let conn = client.get_connection_with_timeout(IO_TIMEOUT)?;
    conn.set_read_timeout(Some(IO_TIMEOUT))?;
    conn.set_write_timeout(Some(IO_TIMEOUT))?;
    Ok(conn)
}

impl EventBus<String> for RedisPubSubEventBus {
    type Error = RedisBusError;

    fn publish(&self, message: String) -> Result<(), Self::Error> {
        let mut guard = self.conn.lock().map_err(|_| RedisBusError::Poisoned)?;

        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => open_connection(&self.client)?,
        };

        let receivers: i64 = conn.publish(&self.channel, message)?;
        *guard = Some(conn);
        tracing::trace!(channel = %self.channel, receivers, "published");
        Ok(())
    }

    fn subscribe(&self) -> Subscription<String> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let channel = self.channel.clone();

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = %e, "redis subscriber could not connect");
                    return;
                }
            };

            let mut pubsub = conn.as_pubsub();
            if let Err(e) = pubsub.subscribe(&channel) {
                tracing::warn!(error = %e, channel = %channel, "redis subscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                if tx.send(payload).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[test]
    #[ignore = "requires a running redis"]
    fn every_subscriber_gets_a_copy() {
        let bus = RedisPubSubEventBus::connect(redis_url(), "cars_events_exchange_test").unwrap();
        let a = bus.subscribe();
        let b = bus.subscribe();
        // Let the subscriber threads register with the broker.
        thread::sleep(Duration::from_millis(200));

        bus.publish(r#"{"eventType":"CREATE"}"#.to_string()).unwrap();

        for sub in [a, b] {
            let got = sub.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(got, r#"{"eventType":"CREATE"}"#);
        }
    }

    #[test]
    fn unreachable_broker_fails_connect() {
        let err = RedisPubSubEventBus::connect("redis://127.0.0.1:1", "x").unwrap_err();
        assert!(matches!(err, RedisBusError::Redis(_)));
    }
}
