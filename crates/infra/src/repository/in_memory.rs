use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use dealership_core::{CarId, DealerId, Entity};
use dealership_inventory::{Car, CarInput, Dealer, DealerInput, round_rating};

use super::r#trait::{CarRepository, DealerRepository, RepositoryError, RepositoryResult};

#[derive(Debug, Default)]
struct Tables {
    dealers: BTreeMap<DealerId, Dealer>,
    cars: BTreeMap<CarId, Car>,
    last_dealer_id: i32,
    last_car_id: i32,
}

impl Tables {
    fn ensure_dealer(&self, id: DealerId) -> RepositoryResult<()> {
        if self.dealers.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::ConstraintViolation(format!(
                "cars.dealer_id references missing dealer {id}"
            )))
        }
    }
}

/// In-memory relational store shared by both in-memory repositories.
///
/// Intended for tests/dev. Mirrors the Postgres schema: serial ids starting at 1, the
/// `cars.dealer_id` foreign key, `ON DELETE CASCADE`, and one-decimal ratings. Text
/// widths are enforced by input validation, which runs here as it does for Postgres.
/// The lock is never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dealers(&self) -> InMemoryDealerRepository {
        InMemoryDealerRepository { store: self.clone() }
    }

    pub fn cars(&self) -> InMemoryCarRepository {
        InMemoryCarRepository { store: self.clone() }
    }

    /// Simulate an exhausted pool: every subsequent operation fails with `PoolExhausted`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::PoolExhausted);
        }
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Connection("in-memory store lock poisoned".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryDealerRepository {
    store: InMemoryStore,
}

#[derive(Debug, Clone)]
pub struct InMemoryCarRepository {
    store: InMemoryStore,
}

#[async_trait]
impl DealerRepository for InMemoryDealerRepository {
    async fn list(&self) -> RepositoryResult<Vec<Dealer>> {
        Ok(self.store.lock()?.dealers.values().cloned().collect())
    }

    async fn get(&self, id: DealerId) -> RepositoryResult<Dealer> {
        self.store.lock()?.dealers.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, input: DealerInput) -> RepositoryResult<Dealer> {
        input.validate()?;
        let mut tables = self.store.lock()?;
        let id = DealerId::new(tables.last_dealer_id + 1);
        let mut dealer = input.into_dealer(id)?;
        dealer.rating = round_rating(dealer.rating);

        tables.last_dealer_id = id.get();
        tables.dealers.insert(dealer.id(), dealer.clone());
        Ok(dealer)
    }

    async fn update(&self, id: DealerId, input: DealerInput) -> RepositoryResult<Dealer> {
        input.validate()?;
        let mut tables = self.store.lock()?;
        let slot = tables.dealers.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let mut dealer = input.into_dealer(id)?;
        dealer.rating = round_rating(dealer.rating);

        *slot = dealer.clone();
        Ok(dealer)
    }

    async fn delete(&self, id: DealerId) -> RepositoryResult<Dealer> {
        let mut tables = self.store.lock()?;
        let dealer = tables.dealers.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.cars.retain(|_, car| car.dealer_id != id);
        Ok(dealer)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.store.lock()?.dealers.len() as i64)
    }
}

#[async_trait]
impl CarRepository for InMemoryCarRepository {
    async fn list(&self) -> RepositoryResult<Vec<Car>> {
        Ok(self.store.lock()?.cars.values().cloned().collect())
    }

    async fn get(&self, id: CarId) -> RepositoryResult<Car> {
        self.store.lock()?.cars.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, input: CarInput) -> RepositoryResult<Car> {
        input.validate()?;
        let mut tables = self.store.lock()?;
        tables.ensure_dealer(input.dealer_id)?;
        let id = CarId::new(tables.last_car_id + 1);
        let car = input.into_car(id)?;

        tables.last_car_id = id.get();
        tables.cars.insert(car.id(), car.clone());
        Ok(car)
    }

    async fn update(&self, id: CarId, input: CarInput) -> RepositoryResult<Car> {
        input.validate()?;
        let mut tables = self.store.lock()?;
        if !tables.cars.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.ensure_dealer(input.dealer_id)?;
        let car = input.into_car(id)?;

        tables.cars.insert(car.id(), car.clone());
        Ok(car)
    }

    async fn delete(&self, id: CarId) -> RepositoryResult<Car> {
        self.store.lock()?.cars.remove(&id).ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dealer_input(name: &str, rating: f64) -> DealerInput {
        DealerInput {
            name: name.to_string(),
            city: "Samara".to_string(),
            address: "Molodogvardeyskaya 2".to_string(),
            area: "Leninsky".to_string(),
            rating: Some(rating),
        }
    }

    fn car_input(dealer_id: DealerId) -> CarInput {
        CarInput {
            firm: "Hyundai".to_string(),
            model: "Solaris".to_string(),
            year: 2018,
            power: 123,
            color: Some("silver".to_string()),
            price: 950_000,
            dealer_id,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_input_plus_id() {
        let store = InMemoryStore::new();
        let dealers = store.dealers();
        let cars = store.cars();

        let dealer = dealers.create(dealer_input("North", 4.0)).await.unwrap();
        assert_eq!(dealer.id, DealerId::new(1));
        assert_eq!(dealers.get(dealer.id).await.unwrap(), dealer);
        assert_eq!(DealerInput::from(dealer.clone()), dealer_input("North", 4.0));

        let car = cars.create(car_input(dealer.id)).await.unwrap();
        assert_eq!(cars.get(car.id).await.unwrap(), car);
        assert_eq!(CarInput::from(car), car_input(dealer.id));
    }

    #[tokio::test]
    async fn list_is_ascending_and_empty_is_not_an_error() {
        let store = InMemoryStore::new();
        let dealers = store.dealers();
        assert!(dealers.list().await.unwrap().is_empty());
        assert!(store.cars().list().await.unwrap().is_empty());

        for name in ["a", "b", "c"] {
            dealers.create(dealer_input(name, 3.0)).await.unwrap();
        }
        let ids: Vec<i32> = dealers.list().await.unwrap().iter().map(|d| d.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found_for_every_operation() {
        let store = InMemoryStore::new();
        let dealers = store.dealers();
        let cars = store.cars();
        let dealer = dealers.create(dealer_input("x", 1.0)).await.unwrap();
        let ghost = CarId::new(404);

        assert_eq!(cars.get(ghost).await.unwrap_err(), RepositoryError::NotFound);
        assert_eq!(cars.update(ghost, car_input(dealer.id)).await.unwrap_err(), RepositoryError::NotFound);
        assert_eq!(cars.delete(ghost).await.unwrap_err(), RepositoryError::NotFound);

        let ghost = DealerId::new(404);
        assert_eq!(dealers.get(ghost).await.unwrap_err(), RepositoryError::NotFound);
        assert_eq!(
            dealers.update(ghost, dealer_input("y", 2.0)).await.unwrap_err(),
            RepositoryError::NotFound
        );
        assert_eq!(dealers.delete(ghost).await.unwrap_err(), RepositoryError::NotFound);
    }

    #[tokio::test]
    async fn validation_runs_before_store_access() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let err = store.dealers().create(dealer_input("x", 5.1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));

        let err = store.dealers().create(dealer_input("x", 5.0)).await.unwrap_err();
        assert_eq!(err, RepositoryError::PoolExhausted);
    }

    #[tokio::test]
    async fn unknown_dealer_is_a_constraint_violation() {
        let store = InMemoryStore::new();
        let err = store.cars().create(car_input(DealerId::new(9))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
        assert!(store.cars().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_dealer_cascades_to_its_cars() {
        let store = InMemoryStore::new();
        let dealers = store.dealers();
        let cars = store.cars();
        let keep = dealers.create(dealer_input("keep", 4.0)).await.unwrap();
        let gone = dealers.create(dealer_input("gone", 2.0)).await.unwrap();
        for dealer_id in [keep.id, gone.id, gone.id, keep.id] {
            cars.create(car_input(dealer_id)).await.unwrap();
        }
        assert_eq!(cars.list().await.unwrap().len(), 4);

        let removed = dealers.delete(gone.id).await.unwrap();
        assert_eq!(removed, gone);

        let left = cars.list().await.unwrap();
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|c| c.dealer_id == keep.id));
    }

    #[tokio::test]
    async fn delete_returns_pre_delete_image() {
        let store = InMemoryStore::new();
        let dealer = store.dealers().create(dealer_input("d", 3.5)).await.unwrap();
        let car = store.cars().create(car_input(dealer.id)).await.unwrap();

        assert_eq!(store.cars().delete(car.id).await.unwrap(), car);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryStore::new();
        let dealers = store.dealers();
        let first = dealers.create(dealer_input("1", 1.0)).await.unwrap();
        dealers.delete(first.id).await.unwrap();
        let second = dealers.create(dealer_input("2", 1.0)).await.unwrap();
        assert_eq!(second.id, DealerId::new(2));
    }

    #[tokio::test]
    async fn over_wide_text_is_rejected_like_the_varchar_columns() {
        let store = InMemoryStore::new();
        let mut widest = dealer_input("w", 3.0);
        widest.name = "n".repeat(dealership_inventory::MAX_TEXT_LEN);
        let dealer = store.dealers().create(widest).await.unwrap();

        let mut too_wide = car_input(dealer.id);
        too_wide.model = "m".repeat(dealership_inventory::MAX_TEXT_LEN + 1);
        let err = store.cars().create(too_wide).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert!(store.cars().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ratings_are_stored_with_one_decimal() {
        let store = InMemoryStore::new();
        let dealer = store.dealers().create(dealer_input("r", 4.55)).await.unwrap();
        assert_eq!(dealer.rating, 4.6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deletes_have_exactly_one_winner() {
        let store = InMemoryStore::new();
        let dealer = store.dealers().create(dealer_input("d", 3.0)).await.unwrap();
        let car = store.cars().create(car_input(dealer.id)).await.unwrap();
        let id = car.id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cars = store.cars();
                tokio::spawn(async move { cars.delete(id).await })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(deleted) => {
                    assert_eq!(deleted, car);
                    wins += 1;
                }
                Err(e) => assert_eq!(e, RepositoryError::NotFound),
            }
        }
        assert_eq!(wins, 1);
    }
}
