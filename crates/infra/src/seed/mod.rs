//! One-shot bulk import of dealers and cars into an empty store.
//!
//! The gate is a single dealer `count()` taken before anything is written. The import
//! itself is not transactional: a failure part-way leaves the rows already inserted,
//! and because the gate then sees dealers, a restart will not retry it.
//!
//! Cars are distributed round-robin over the dealers in source order
//! (`car[i].dealer_id = dealer_ids[i % dealers]`). A car list with no dealers to
//! receive it is rejected before any write.

pub mod loader;

use std::path::PathBuf;

use thiserror::Error;

use dealership_inventory::{CarInput, DealerInput};

use crate::config::SeedSettings;
use crate::repository::{CarRepository, DealerRepository, RepositoryError};

pub use loader::{LoadError, load_cars, load_dealers};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("invalid seed data: {0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held dealers; nothing was written.
    Skipped { existing: i64 },
    Imported { dealers: usize, cars: usize },
}

/// Insert `dealers` then `cars`, assigning each car a dealer round-robin.
///
/// Bypasses the event publisher: seeded cars are not announced.
pub async fn import<D, C>(
    dealer_repo: &D,
    car_repo: &C,
    dealers: Vec<DealerInput>,
    cars: Vec<CarInput>,
) -> Result<SeedOutcome, SeedError>
where
    D: DealerRepository + ?Sized,
    C: CarRepository + ?Sized,
{
    if dealers.is_empty() && !cars.is_empty() {
        return Err(SeedError::Validation(format!(
            "{} cars to import but no dealers to assign them to",
            cars.len()
        )));
    }

    let mut ids = Vec::with_capacity(dealers.len());
    for dealer in dealers {
        ids.push(dealer_repo.create(dealer).await?.id);
    }

    let car_count = cars.len();
    for (i, car) in cars.into_iter().enumerate() {
        let dealer_id = ids[i % ids.len()];
        car_repo.create(CarInput { dealer_id, ..car }).await?;
    }

    tracing::info!(dealers = ids.len(), cars = car_count, "seed import complete");
    Ok(SeedOutcome::Imported {
        dealers: ids.len(),
        cars: car_count,
    })
}

/// Run [`import`] from the configured documents if the dealer table is empty.
pub async fn import_if_empty<D, C>(
    dealer_repo: &D,
    car_repo: &C,
    settings: &SeedSettings,
) -> Result<SeedOutcome, SeedError>
where
    D: DealerRepository + ?Sized,
    C: CarRepository + ?Sized,
{
    let existing = dealer_repo.count().await?;
    if existing > 0 {
        tracing::info!(existing, "store not empty, skipping seed import");
        return Ok(SeedOutcome::Skipped { existing });
    }

    let dealers = load_dealers(&settings.dealers_path).map_err(|source| SeedError::Load {
        path: settings.dealers_path.clone(),
        source,
    })?;
    let cars = load_cars(&settings.cars_path).map_err(|source| SeedError::Load {
        path: settings.cars_path.clone(),
        source,
    })?;

    import(dealer_repo, car_repo, dealers, cars).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use proptest::prelude::*;
    use tempfile::NamedTempFile;

    use dealership_core::DealerId;

    use crate::repository::InMemoryStore;

    use super::*;

    fn dealer(n: usize) -> DealerInput {
        DealerInput {
            name: format!("dealer-{n}"),
            city: "Perm".to_string(),
            address: format!("Lenina {n}"),
            area: "Centre".to_string(),
            rating: Some(3.0),
        }
    }

    fn car(n: usize) -> CarInput {
        CarInput {
            firm: "UAZ".to_string(),
            model: format!("Patriot {n}"),
            year: 2015,
            power: 135,
            color: None,
            price: 800_000,
            dealer_id: DealerId::new(0),
        }
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    proptest! {
        #[test]
        fn cars_cycle_over_dealers_in_source_order(n in 1usize..6, m in 0usize..20) {
            let store = InMemoryStore::new();
            let (dealers, cars) = (store.dealers(), store.cars());

            let outcome = block_on(import(
                &dealers,
                &cars,
                (0..n).map(dealer).collect(),
                (0..m).map(car).collect(),
            ))
            .unwrap();
            prop_assert_eq!(outcome, SeedOutcome::Imported { dealers: n, cars: m });

            let dealer_ids: Vec<DealerId> = block_on(dealers.list()).unwrap().iter().map(|d| d.id).collect();
            prop_assert_eq!(dealer_ids.len(), n);

            let stored = block_on(cars.list()).unwrap();
            prop_assert_eq!(stored.len(), m);
            for (i, c) in stored.iter().enumerate() {
                prop_assert_eq!(c.dealer_id, dealer_ids[i % n]);
                prop_assert_eq!(&c.model, &format!("Patriot {i}"));
            }
        }
    }

    #[tokio::test]
    async fn cars_without_dealers_fail_before_writing() {
        let store = InMemoryStore::new();
        let err = import(&store.dealers(), &store.cars(), Vec::new(), vec![car(0)])
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Validation(_)));
        assert!(store.cars().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_documents_import_nothing() {
        let store = InMemoryStore::new();
        let outcome = import(&store.dealers(), &store.cars(), Vec::new(), Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome, SeedOutcome::Imported { dealers: 0, cars: 0 });
    }

    #[tokio::test]
    async fn invalid_rows_stop_the_import_and_keep_earlier_rows() {
        let store = InMemoryStore::new();
        let mut bad = dealer(1);
        bad.rating = Some(7.0);

        let err = import(&store.dealers(), &store.cars(), vec![dealer(0), bad], vec![car(0)])
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Repository(RepositoryError::Validation(_))));
        assert_eq!(store.dealers().count().await.unwrap(), 1);
        assert!(store.cars().list().await.unwrap().is_empty());
    }

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let dealers = write(
            r#"[{"name": "A", "city": "Ufa", "address": "Mira 1", "area": "N", "rating": 4.0},
                {"name": "B", "city": "Ufa", "address": "Mira 2", "area": "S", "rating": 2.5}]"#,
        );
        let cars = write(
            r#"{"cars": [{"firm": "GAZ", "model": "Volga", "year": 2005, "power": 131, "price": 200000},
                         {"firm": "GAZ", "model": "Sobol", "year": 2012, "power": 120, "price": 450000},
                         {"firm": "GAZ", "model": "Gazelle", "year": 2014, "power": 107, "price": 600000}]}"#,
        );
        let settings = SeedSettings {
            enabled: true,
            dealers_path: dealers.path().to_path_buf(),
            cars_path: cars.path().to_path_buf(),
        };
        let store = InMemoryStore::new();

        let first = import_if_empty(&store.dealers(), &store.cars(), &settings).await.unwrap();
        assert_eq!(first, SeedOutcome::Imported { dealers: 2, cars: 3 });

        let second = import_if_empty(&store.dealers(), &store.cars(), &settings).await.unwrap();
        assert_eq!(second, SeedOutcome::Skipped { existing: 2 });
        assert_eq!(store.cars().list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn missing_document_names_the_path() {
        let settings = SeedSettings {
            enabled: true,
            dealers_path: PathBuf::from("/nope/dealers.json"),
            cars_path: PathBuf::from("/nope/cars.json"),
        };
        let store = InMemoryStore::new();
        match import_if_empty(&store.dealers(), &store.cars(), &settings).await {
            Err(SeedError::Load { path, .. }) => assert_eq!(path, PathBuf::from("/nope/dealers.json")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
