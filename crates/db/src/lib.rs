//! Job persistence.
//!
//! [`JobStore`] is the contract the engine codes against. [`PgJobStore`] is
//! the durable PostgreSQL implementation; [`MemoryJobStore`] keeps records in
//! process memory for tests and database-less runs.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use repositories::{MemoryJobStore, PgJobStore};
pub use store::{JobStore, NewJob};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
