//! Connection pool management.
//!
//! Uses sqlx `PgPool` with explicit bounds: a warm minimum, a hard maximum, retirement
//! by age and by idleness, and a bounded acquisition window. A pooled connection is
//! handed out as a `PoolConnection` guard that returns itself to the pool on drop, so
//! every exit path (including `?` and panics) releases exactly once.

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PoolSettings;

/// Snapshot of pool occupancy for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max: u32,
}

impl PoolStats {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
            max: pool.options().get_max_connections(),
        }
    }
}

/// Create a PostgreSQL connection pool and verify it with a round-trip.
///
/// # Errors
///
/// Returns an error if no connection can be established within the acquire timeout.
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .max_lifetime(settings.max_lifetime)
        .idle_timeout(settings.idle_timeout)
        .acquire_timeout(settings.acquire_timeout)
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    if let Err(e) = ping(&pool).await {
        pool.close().await;
        return Err(e);
    }

    let stats = PoolStats::of(&pool);
    tracing::info!(size = stats.size, max = stats.max, "connection pool ready");
    Ok(pool)
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Periodically probe pool readiness.
///
/// The probe borrows a connection like any request would and holds no application
/// lock. It stops once the pool is closed; abort the handle for an earlier stop.
pub fn spawn_health_probe(pool: PgPool, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the pool was just verified.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if pool.is_closed() {
                tracing::debug!("pool closed; health probe exiting");
                return;
            }
            match ping(&pool).await {
                Ok(()) => {
                    let stats = PoolStats::of(&pool);
                    tracing::debug!(size = stats.size, idle = stats.idle, "pool health probe ok");
                }
                Err(e) => tracing::warn!(error = %e, "pool health probe failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p dealership-infra -- --ignored

    fn settings() -> PoolSettings {
        PoolSettings {
            max_connections: 2,
            min_connections: 0,
            acquire_timeout: Duration::from_millis(300),
            ..PoolSettings::default()
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_and_releases() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, &settings()).await.expect("pool creation failed");

        // More sequential acquisitions than the pool can hold at once: each guard
        // must be returned on drop or the later ones would time out.
        for _ in 0..5 {
            let mut conn = pool.acquire().await.expect("acquire failed");
            let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&mut *conn).await.unwrap();
            assert_eq!(one, 1);
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn exhausted_pool_times_out_instead_of_blocking() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, &settings()).await.expect("pool creation failed");

        let _a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, sqlx::Error::PoolTimedOut));
    }
}
