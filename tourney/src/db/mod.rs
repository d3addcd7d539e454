//! Persistence: PostgreSQL connection pooling and the bracket store backends.
//!
//! The engine talks to storage only through [`BracketStore`] and [`StoreTx`].
//! [`PgStore`] is the production backend; [`MemoryStore`] keeps everything in
//! process and is what the test suites run against.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::{FailPoint, MemoryStore, MemoryTx};
pub use postgres::{PgStore, PgTx};
pub use repository::{BracketStore, StoreTx, complete_transaction};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tourney::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::with_url("postgres://postgres@localhost/tourney");
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build a [`PgStore`] sharing this pool
    pub fn store(&self) -> PgStore {
        PgStore::new(Arc::new(self.pool.clone()))
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
