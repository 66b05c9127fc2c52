use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use dealership_core::{CarId, DealerId, DomainError};
use dealership_inventory::{Car, CarInput, Dealer, DealerInput};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository failure taxonomy.
///
/// `Validation` is raised before any store access. `NotFound` covers both a missing id
/// and a row deleted concurrently between lookup and write. Everything else comes from
/// the store or the pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    /// The store rejected the write (foreign key, check, not-null).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// No connection became available within the acquisition window.
    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("connection error: {0}")]
    Connection(String),

    /// Any other error reported by the database server.
    #[error("database error: {0}")]
    Database(String),

    #[error("failed to decode row: {0}")]
    Decode(String),
}

impl From<DomainError> for RepositoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => RepositoryError::Validation(msg),
            DomainError::InvalidId(msg) => RepositoryError::Validation(msg),
        }
    }
}

/// CRUD over dealers.
///
/// `delete` returns the row as it was just before deletion. Deleting a dealer also
/// deletes every car referencing it.
#[async_trait]
pub trait DealerRepository: Send + Sync {
    /// All dealers in ascending id order.
    async fn list(&self) -> RepositoryResult<Vec<Dealer>>;

    async fn get(&self, id: DealerId) -> RepositoryResult<Dealer>;

    async fn create(&self, input: DealerInput) -> RepositoryResult<Dealer>;

    /// Full-row replace.
    async fn update(&self, id: DealerId, input: DealerInput) -> RepositoryResult<Dealer>;

    async fn delete(&self, id: DealerId) -> RepositoryResult<Dealer>;

    async fn count(&self) -> RepositoryResult<i64>;
}

/// CRUD over cars. Same contract as [`DealerRepository`].
#[async_trait]
pub trait CarRepository: Send + Sync {
    async fn list(&self) -> RepositoryResult<Vec<Car>>;

    async fn get(&self, id: CarId) -> RepositoryResult<Car>;

    async fn create(&self, input: CarInput) -> RepositoryResult<Car>;

    async fn update(&self, id: CarId, input: CarInput) -> RepositoryResult<Car>;

    async fn delete(&self, id: CarId) -> RepositoryResult<Car>;
}

#[async_trait]
impl<R> DealerRepository for Arc<R>
where
    R: DealerRepository + ?Sized,
{
    async fn list(&self) -> RepositoryResult<Vec<Dealer>> {
        (**self).list().await
    }

    async fn get(&self, id: DealerId) -> RepositoryResult<Dealer> {
        (**self).get(id).await
    }

    async fn create(&self, input: DealerInput) -> RepositoryResult<Dealer> {
        (**self).create(input).await
    }

    async fn update(&self, id: DealerId, input: DealerInput) -> RepositoryResult<Dealer> {
        (**self).update(id, input).await
    }

    async fn delete(&self, id: DealerId) -> RepositoryResult<Dealer> {
        (**self).delete(id).await
    }

    async fn count(&self) -> RepositoryResult<i64> {
        (**self).count().await
    }
}

#[async_trait]
impl<R> CarRepository for Arc<R>
where
    R: CarRepository + ?Sized,
{
    async fn list(&self) -> RepositoryResult<Vec<Car>> {
        (**self).list().await
    }

    async fn get(&self, id: CarId) -> RepositoryResult<Car> {
        (**self).get(id).await
    }

    async fn create(&self, input: CarInput) -> RepositoryResult<Car> {
        (**self).create(input).await
    }

    async fn update(&self, id: CarId, input: CarInput) -> RepositoryResult<Car> {
        (**self).update(id, input).await
    }

    async fn delete(&self, id: CarId) -> RepositoryResult<Car> {
        (**self).delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_caller_fixable() {
        assert_eq!(
            RepositoryError::from(DomainError::validation("missing required fields: firm")),
            RepositoryError::Validation("missing required fields: firm".to_string())
        );
        let err = "0".parse::<CarId>().map_err(RepositoryError::from).unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }
}
