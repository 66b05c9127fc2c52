//! Postgres-backed repositories.
//!
//! Every method takes one connection from the pool for its whole operation and returns
//! it when the guard drops. All statements are parameterized.
//!
//! ## Atomic mutations
//!
//! `update` and `delete` are single conditional statements (`... WHERE id = $n
//! RETURNING ...`). The affected row, or its absence, is the only existence signal, so
//! there is no window between an existence check and the write. Of two concurrent
//! deletes of the same id, exactly one gets the row back; the other sees `NotFound`.
//!
//! ## Error Mapping
//!
//! | sqlx error | SQLSTATE | RepositoryError |
//! |------------|----------|-----------------|
//! | Database (foreign key violation) | `23503` | `ConstraintViolation` |
//! | Database (check violation) | `23514` | `ConstraintViolation` |
//! | Database (not-null violation) | `23502` | `ConstraintViolation` |
//! | Database (numeric out of range) | `22003` | `ConstraintViolation` |
//! | Database (string too long) | `22001` | `ConstraintViolation` |
//! | Database (other) | any | `Database` |
//! | PoolTimedOut | n/a | `PoolExhausted` |
//! | PoolClosed / Io / Tls / Protocol | n/a | `Connection` |
//! | ColumnDecode / Decode / ColumnNotFound | n/a | `Decode` |
//! | RowNotFound | n/a | `NotFound` |

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::instrument;

use dealership_core::{CarId, DealerId};
use dealership_inventory::{Car, CarInput, Dealer, DealerInput};

use super::r#trait::{CarRepository, DealerRepository, RepositoryError, RepositoryResult};

#[derive(Debug, FromRow)]
struct DealerRow {
    id: i32,
    name: String,
    city: String,
    address: String,
    area: String,
    rating: f64,
}

impl From<DealerRow> for Dealer {
    fn from(r: DealerRow) -> Self {
        Dealer {
            id: DealerId::new(r.id),
            name: r.name,
            city: r.city,
            address: r.address,
            area: r.area,
            rating: r.rating,
        }
    }
}

#[derive(Debug, FromRow)]
struct CarRow {
    id: i32,
    firm: String,
    model: String,
    year: i32,
    power: i32,
    color: Option<String>,
    price: i32,
    dealer_id: i32,
}

impl From<CarRow> for Car {
    fn from(r: CarRow) -> Self {
        Car {
            id: CarId::new(r.id),
            firm: r.firm,
            model: r.model,
            year: r.year,
            power: r.power,
            color: r.color,
            price: r.price,
            dealer_id: DealerId::new(r.dealer_id),
        }
    }
}

async fn acquire(pool: &PgPool) -> RepositoryResult<PoolConnection<Postgres>> {
    pool.acquire().await.map_err(|e| map_sqlx_error("acquire", e))
}

#[derive(Debug, Clone)]
pub struct PostgresDealerRepository {
    pool: PgPool,
}

impl PostgresDealerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DealerRepository for PostgresDealerRepository {
    #[instrument(skip(self), err)]
    async fn list(&self) -> RepositoryResult<Vec<Dealer>> {
        let mut conn = acquire(&self.pool).await?;
        let rows = sqlx::query_as::<_, DealerRow>(
            r#"
            SELECT id, name, city, address, area, rating::float8 AS rating
            FROM dealers
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_dealers", e))?;

        Ok(rows.into_iter().map(Dealer::from).collect())
    }

    #[instrument(skip(self), fields(dealer_id = %id), err)]
    async fn get(&self, id: DealerId) -> RepositoryResult<Dealer> {
        let mut conn = acquire(&self.pool).await?;
        sqlx::query_as::<_, DealerRow>(
            r#"
            SELECT id, name, city, address, area, rating::float8 AS rating
            FROM dealers
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_dealer", e))?
        .map(Dealer::from)
        .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self, input), err)]
    async fn create(&self, input: DealerInput) -> RepositoryResult<Dealer> {
        input.validate()?;
        let mut conn = acquire(&self.pool).await?;
        let row = sqlx::query_as::<_, DealerRow>(
            r#"
            INSERT INTO dealers (name, city, address, area, rating)
            VALUES ($1, $2, $3, $4, $5::numeric(3,1))
            RETURNING id, name, city, address, area, rating::float8 AS rating
            "#,
        )
        .bind(&input.name)
        .bind(&input.city)
        .bind(&input.address)
        .bind(&input.area)
        .bind(input.rating)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("create_dealer", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self, input), fields(dealer_id = %id), err)]
    async fn update(&self, id: DealerId, input: DealerInput) -> RepositoryResult<Dealer> {
        input.validate()?;
        let mut conn = acquire(&self.pool).await?;
        sqlx::query_as::<_, DealerRow>(
            r#"
            UPDATE dealers
            SET name = $1, city = $2, address = $3, area = $4, rating = $5::numeric(3,1)
            WHERE id = $6
            RETURNING id, name, city, address, area, rating::float8 AS rating
            "#,
        )
        .bind(&input.name)
        .bind(&input.city)
        .bind(&input.address)
        .bind(&input.area)
        .bind(input.rating)
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_dealer", e))?
        .map(Dealer::from)
        .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), fields(dealer_id = %id), err)]
    async fn delete(&self, id: DealerId) -> RepositoryResult<Dealer> {
        let mut conn = acquire(&self.pool).await?;
        sqlx::query_as::<_, DealerRow>(
            r#"
            DELETE FROM dealers
            WHERE id = $1
            RETURNING id, name, city, address, area, rating::float8 AS rating
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_dealer", e))?
        .map(Dealer::from)
        .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> RepositoryResult<i64> {
        let mut conn = acquire(&self.pool).await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dealers")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("count_dealers", e))?;
        Ok(count)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresCarRepository {
    pool: PgPool,
}

impl PostgresCarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CarRepository for PostgresCarRepository {
    #[instrument(skip(self), err)]
    async fn list(&self) -> RepositoryResult<Vec<Car>> {
        let mut conn = acquire(&self.pool).await?;
        let rows = sqlx::query_as::<_, CarRow>(
            r#"
            SELECT id, firm, model, year, power, color, price, dealer_id
            FROM cars
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_cars", e))?;

        Ok(rows.into_iter().map(Car::from).collect())
    }

    #[instrument(skip(self), fields(car_id = %id), err)]
    async fn get(&self, id: CarId) -> RepositoryResult<Car> {
        let mut conn = acquire(&self.pool).await?;
        sqlx::query_as::<_, CarRow>(
            r#"
            SELECT id, firm, model, year, power, color, price, dealer_id
            FROM cars
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_car", e))?
        .map(Car::from)
        .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self, input), fields(dealer_id = %input.dealer_id), err)]
    async fn create(&self, input: CarInput) -> RepositoryResult<Car> {
        input.validate()?;
        let input = input.normalized();
        let mut conn = acquire(&self.pool).await?;
        let row = sqlx::query_as::<_, CarRow>(
            r#"
            INSERT INTO cars (firm, model, year, power, color, price, dealer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, firm, model, year, power, color, price, dealer_id
            "#,
        )
        .bind(&input.firm)
        .bind(&input.model)
        .bind(input.year)
        .bind(input.power)
        .bind(&input.color)
        .bind(input.price)
        .bind(input.dealer_id.get())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("create_car", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self, input), fields(car_id = %id), err)]
    async fn update(&self, id: CarId, input: CarInput) -> RepositoryResult<Car> {
        input.validate()?;
        let input = input.normalized();
        let mut conn = acquire(&self.pool).await?;
        sqlx::query_as::<_, CarRow>(
            r#"
            UPDATE cars
            SET firm = $1, model = $2, year = $3, power = $4, color = $5, price = $6, dealer_id = $7
            WHERE id = $8
            RETURNING id, firm, model, year, power, color, price, dealer_id
            "#,
        )
        .bind(&input.firm)
        .bind(&input.model)
        .bind(input.year)
        .bind(input.power)
        .bind(&input.color)
        .bind(input.price)
        .bind(input.dealer_id.get())
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_car", e))?
        .map(Car::from)
        .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), fields(car_id = %id), err)]
    async fn delete(&self, id: CarId) -> RepositoryResult<Car> {
        let mut conn = acquire(&self.pool).await?;
        sqlx::query_as::<_, CarRow>(
            r#"
            DELETE FROM cars
            WHERE id = $1
            RETURNING id, firm, model, year, power, color, price, dealer_id
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_car", e))?
        .map(Car::from)
        .ok_or(RepositoryError::NotFound)
    }
}

/// Map SQLx errors to repository errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} failed: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") | Some("23514") | Some("23502") | Some("22003") | Some("22001") => {
                    RepositoryError::ConstraintViolation(msg)
                }
                _ => RepositoryError::Database(msg),
            }
        }
        sqlx::Error::PoolTimedOut => RepositoryError::PoolExhausted,
        sqlx::Error::PoolClosed => {
            RepositoryError::Connection(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. }) => {
            RepositoryError::Decode(format!("{} failed: {}", operation, e))
        }
        e => RepositoryError::Connection(format!("{} failed: {}", operation, e)),
    }
}
