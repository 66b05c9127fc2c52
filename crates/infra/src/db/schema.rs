//! Table bootstrap for a fresh database.

use sqlx::PgPool;

const CREATE_DEALERS: &str = r#"
CREATE TABLE IF NOT EXISTS dealers (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    city VARCHAR(100) NOT NULL,
    address VARCHAR(100) NOT NULL,
    area VARCHAR(100) NOT NULL,
    rating NUMERIC(3,1) NOT NULL CHECK (rating >= 0 AND rating <= 5)
)
"#;

const CREATE_CARS: &str = r#"
CREATE TABLE IF NOT EXISTS cars (
    id SERIAL PRIMARY KEY,
    firm VARCHAR(100) NOT NULL,
    model VARCHAR(100) NOT NULL,
    year INTEGER NOT NULL,
    power INTEGER NOT NULL,
    color VARCHAR(100),
    price INTEGER NOT NULL,
    dealer_id INTEGER NOT NULL REFERENCES dealers(id) ON DELETE CASCADE
)
"#;

/// Create both tables if they do not exist. Existing tables are left untouched.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    sqlx::query(CREATE_DEALERS).execute(&mut *conn).await?;
    sqlx::query(CREATE_CARS).execute(&mut *conn).await?;
    tracing::info!("schema ready");
    Ok(())
}
