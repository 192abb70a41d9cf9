//! # Registrar DB
//!
//! Transactional storage for the Registrar rules engine.
//!
//! Services talk to a [`Store`] and never to a concrete backend. Two
//! implementations are provided:
//!
//! - [`PgStore`]: PostgreSQL through SQLx, serializable transactions
//! - [`MemoryStore`]: embedded store for tests, demos and the CLI dry runs
//!
//! # Example
//!
//! ```ignore
//! use registrar_config::DatabaseConfig;
//! use registrar_db::{PgStore, init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(&DatabaseConfig::from_env()).await?;
//! run_migrations(&pool).await?;
//! let store = PgStore::new(pool);
//! ```

pub mod constraints;
pub mod memory;
pub mod postgres;
pub mod store;

use registrar_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Store, StoreResult, StoreTx};

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Opens a PostgreSQL connection pool.
///
/// Fails with a configuration error when no `DATABASE_URL` is configured.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| sqlx::Error::Configuration("DATABASE_URL must be set".into()))?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(url)
        .await
}

/// Applies the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}
