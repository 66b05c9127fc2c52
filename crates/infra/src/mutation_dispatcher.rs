//! Mutation pipeline (application-level orchestration).
//!
//! The dispatcher composes the two repositories with an optional event publisher and
//! owns the one ordering rule that matters:
//!
//! ```text
//! request
//!   ↓
//! 1. Repository validates and executes the mutation (single atomic statement)
//!   ↓ Err → returned to the caller, nothing published
//!   ↓ Ok(car)
//! 2. CarEvent built from the committed row and queued on the publisher
//!   ↓
//! 3. Ok(car) returned; the response never depends on step 2
//! ```
//!
//! Step 2 is synchronous and happens right after the repository future resolves, so
//! there is no await point between commit and enqueue. Dropping the request future after
//! commit therefore cannot lose the event.
//!
//! ## Coverage
//!
//! Only car mutations are announced. Dealer mutations emit nothing, and neither do the
//! cars removed by a dealer's cascade delete. Consumers that mirror the car table must
//! tolerate that gap.

use std::sync::Arc;

use dealership_core::{CarId, DealerId};
use dealership_inventory::{Car, CarEvent, CarInput, Dealer, DealerInput};

use crate::publisher::EventPublisher;
use crate::repository::{CarRepository, DealerRepository, RepositoryResult};

/// `None` disables publication; every notify becomes a no-op.
pub type PublisherHandle = Option<Arc<EventPublisher>>;

#[derive(Debug, Clone)]
pub struct MutationDispatcher<D, C> {
    dealers: D,
    cars: C,
    publisher: PublisherHandle,
}

impl<D, C> MutationDispatcher<D, C>
where
    D: DealerRepository,
    C: CarRepository,
{
    pub fn new(dealers: D, cars: C, publisher: PublisherHandle) -> Self {
        Self {
            dealers,
            cars,
            publisher,
        }
    }

    pub fn publisher_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn dealer_repository(&self) -> &D {
        &self.dealers
    }

    pub fn car_repository(&self) -> &C {
        &self.cars
    }

    pub async fn list_dealers(&self) -> RepositoryResult<Vec<Dealer>> {
        self.dealers.list().await
    }

    pub async fn get_dealer(&self, id: DealerId) -> RepositoryResult<Dealer> {
        self.dealers.get(id).await
    }

    pub async fn create_dealer(&self, input: DealerInput) -> RepositoryResult<Dealer> {
        self.dealers.create(input).await
    }

    pub async fn update_dealer(&self, id: DealerId, input: DealerInput) -> RepositoryResult<Dealer> {
        self.dealers.update(id, input).await
    }

    pub async fn delete_dealer(&self, id: DealerId) -> RepositoryResult<Dealer> {
        self.dealers.delete(id).await
    }

    pub async fn list_cars(&self) -> RepositoryResult<Vec<Car>> {
        self.cars.list().await
    }

    pub async fn get_car(&self, id: CarId) -> RepositoryResult<Car> {
        self.cars.get(id).await
    }

    pub async fn create_car(&self, input: CarInput) -> RepositoryResult<Car> {
        let car = self.cars.create(input).await?;
        self.notify(CarEvent::created(car.clone()));
        Ok(car)
    }

    pub async fn update_car(&self, id: CarId, input: CarInput) -> RepositoryResult<Car> {
        let car = self.cars.update(id, input).await?;
        self.notify(CarEvent::updated(car.clone()));
        Ok(car)
    }

    pub async fn delete_car(&self, id: CarId) -> RepositoryResult<Car> {
        let car = self.cars.delete(id).await?;
        self.notify(CarEvent::deleted(car.clone()));
        Ok(car)
    }

    fn notify(&self, event: CarEvent) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        if let Err(e) = publisher.publish(&event) {
            tracing::warn!(
                event_type = event.event_type.as_str(),
                car_id = %event.car.id,
                error = %e,
                "event not queued"
            );
        }
    }
}
