//! `PostgreSQL` storage backend for the airline booking engine.
//!
//! Implements [`Storage`] and [`Transaction`](airline_booking_core::storage::Transaction)
//! from `airline-booking-core` over a sqlx connection pool:
//!
//! - Seat counters change through conditional `UPDATE ... RETURNING`
//!   statements, so `available_seats` never leaves `0..=seat_count`
//! - The daily flight cap is serialized with transaction-scoped advisory
//!   locks keyed on the route and local day
//! - Deleting a flight cascades to fare classes, bookings and passengers
//!   through foreign keys
//!
//! Serialization failures and deadlocks surface as
//! [`StorageError::Conflict`] and are retried by the runtime.
//!
//! # Example
//!
//! ```ignore
//! use airline_booking_postgres::{PostgresConfig, PostgresStorage};
//!
//! let storage = PostgresStorage::connect(&PostgresConfig::from_env()?).await?;
//! storage.migrate().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use airline_booking_core::storage::{Storage, StorageResult};
use airline_booking_core::types::User;
use airline_booking_core::StorageError;
use sqlx::PgPool;

/// Pool settings
pub mod config;

mod rows;
mod transaction;

pub use config::{ConfigError, PostgresConfig};
pub use transaction::PostgresTransaction;

/// `PostgreSQL`-backed [`Storage`].
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the connection fails.
    pub async fn connect(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = config
            .connect()
            .await
            .map_err(|e| StorageError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Create or upgrade the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Insert or replace a user record.
    ///
    /// Users are owned by the external auth layer; this keeps the local
    /// directory in sync with it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the write fails.
    pub async fn upsert_user(&self, user: &User) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO app_users (username, role, airline)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE
            SET role = EXCLUDED.role, airline = EXCLUDED.airline
            ",
        )
        .bind(user.username.as_str())
        .bind(user.role.as_str())
        .bind(user.airline.as_ref().map(|a| a.as_str()))
        .execute(&self.pool)
        .await
        .map_err(transaction::db_error("upsert user"))?;
        Ok(())
    }
}

impl Storage for PostgresStorage {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> StorageResult<PostgresTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(transaction::db_error("begin transaction"))?;
        Ok(PostgresTransaction::new(tx))
    }
}
