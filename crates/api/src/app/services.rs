use std::sync::{Arc, Mutex};

use anyhow::Context;
use sqlx::PgPool;
use tokio::task::JoinHandle;

use dealership_infra::config::{AppConfig, PublisherSettings};
use dealership_infra::db::{self, PoolStats};
use dealership_infra::event_bus::RedisPubSubEventBus;
use dealership_infra::mutation_dispatcher::{MutationDispatcher, PublisherHandle};
use dealership_infra::publisher::{EventPublisher, PublisherStats};
use dealership_infra::repository::{
    CarRepository, DealerRepository, InMemoryStore, PostgresCarRepository, PostgresDealerRepository,
};
use dealership_infra::seed::{self, SeedOutcome};

pub type Dispatcher = MutationDispatcher<Arc<dyn DealerRepository>, Arc<dyn CarRepository>>;

/// Everything handlers need, plus the resources torn down at shutdown.
pub struct AppServices {
    dispatcher: Dispatcher,
    pool: Option<PgPool>,
    publisher: PublisherHandle,
    health_probe: Mutex<Option<JoinHandle<()>>>,
}

impl AppServices {
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// `None` when running over the in-memory store.
    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.pool.as_ref().map(PoolStats::of)
    }

    pub fn publisher_stats(&self) -> Option<PublisherStats> {
        self.publisher.as_ref().map(|p| p.stats())
    }

    /// Flush queued events, stop the health probe and close the pool.
    pub async fn shutdown(&self) {
        if let Some(publisher) = self.publisher.clone() {
            if tokio::task::spawn_blocking(move || publisher.shutdown()).await.is_err() {
                tracing::error!("publisher shutdown task failed");
            }
        }
        let probe = self.health_probe.lock().ok().and_then(|mut h| h.take());
        if let Some(probe) = probe {
            probe.abort();
        }
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
        tracing::info!("services shut down");
    }
}

/// Production wiring: Postgres pool, schema, optional seed, optional Redis publisher.
///
/// An unreachable broker is not fatal: the service starts with publication disabled.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let pool = db::create_pool(&config.database_url, &config.pool)
        .await
        .context("failed to create database pool")?;
    db::ensure_schema(&pool).await.context("failed to create schema")?;

    let dealers: Arc<dyn DealerRepository> = Arc::new(PostgresDealerRepository::new(pool.clone()));
    let cars: Arc<dyn CarRepository> = Arc::new(PostgresCarRepository::new(pool.clone()));

    if config.seed.enabled {
        match seed::import_if_empty(dealers.as_ref(), cars.as_ref(), &config.seed)
            .await
            .context("seed import failed")?
        {
            SeedOutcome::Skipped { existing } => tracing::info!(existing, "seed skipped"),
            SeedOutcome::Imported { dealers, cars } => tracing::info!(dealers, cars, "seed imported"),
        }
    }

    let publisher = match &config.redis_url {
        Some(url) => connect_publisher(url, &config.events_channel, &config.publisher),
        None => {
            tracing::info!("REDIS_URL not set; event publication disabled");
            None
        }
    };

    let probe = db::spawn_health_probe(pool.clone(), config.pool.health_check_period);

    Ok(AppServices {
        dispatcher: MutationDispatcher::new(dealers, cars, publisher.clone()),
        pool: Some(pool),
        publisher,
        health_probe: Mutex::new(Some(probe)),
    })
}

fn connect_publisher(url: &str, channel: &str, settings: &PublisherSettings) -> PublisherHandle {
    let bus = match RedisPubSubEventBus::connect(url, channel) {
        Ok(bus) => bus,
        Err(e) => {
            tracing::warn!(error = %e, "event exchange unreachable; publication disabled");
            return None;
        }
    };
    match EventPublisher::with_settings(bus, settings) {
        Ok(publisher) => Some(Arc::new(publisher)),
        Err(e) => {
            tracing::warn!(error = %e, "event publisher failed to start; publication disabled");
            None
        }
    }
}

/// Wiring over an [`InMemoryStore`], for tests and local runs without Postgres.
pub fn in_memory(store: &InMemoryStore, publisher: PublisherHandle) -> AppServices {
    let dealers: Arc<dyn DealerRepository> = Arc::new(store.dealers());
    let cars: Arc<dyn CarRepository> = Arc::new(store.cars());
    AppServices {
        dispatcher: MutationDispatcher::new(dealers, cars, publisher.clone()),
        pool: None,
        publisher,
        health_probe: Mutex::new(None),
    }
}
