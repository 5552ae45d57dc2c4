//! SQLite-backed transactional store
//!
//! Two execution modes: [`Store::read`] hands out a pooled connection with
//! no transaction, [`Store::write`] opens a transaction wrapped in a
//! [`WriteTx`] guard. A guard that goes out of scope without being committed
//! (early return, error, cancelled task, unwinding panic) rolls back.

use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use super::migrations::{schema_migrations, Migrator};
use super::queries::Queries;
use crate::config::DatabaseConfig;
use crate::domain::StoreError;

/// Connection pool plus the read/write entry points
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for the configured database, creating the file if needed
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(StoreError::Connect)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(StoreError::Connect)?;

        debug!(url = %config.url, "Connected to database");

        Ok(Self::new(pool))
    }

    /// Private in-memory database with the schema applied
    ///
    /// Backed by a single connection that is never recycled, since every
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StoreError::Connect)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StoreError::Connect)?;

        let store = Self::new(pool);
        store.migrate().await?;

        Ok(store)
    }

    /// Apply pending schema migrations, returning the resulting version
    pub async fn migrate(&self) -> Result<Option<i64>, StoreError> {
        let migrator = Migrator::new(self.pool.clone());
        migrator.run(&schema_migrations()).await?;
        migrator.current_version().await
    }

    /// Read-oriented handle running directly on a pooled connection
    pub async fn read(&self) -> Result<ReadConn, StoreError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StoreError::query("failed to acquire a connection", e))?;

        Ok(ReadConn { conn })
    }

    /// Begin an atomic unit of work
    ///
    /// The writer lock is taken up front so units that read before they write
    /// queue on the busy timeout instead of failing on a lock upgrade.
    pub async fn write(&self) -> Result<WriteTx, StoreError> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(StoreError::Begin)?;
        Ok(WriteTx { tx })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Pooled connection for reads
pub struct ReadConn {
    conn: PoolConnection<Sqlite>,
}

impl ReadConn {
    pub fn queries(&mut self) -> Queries<'_> {
        Queries::new(&mut self.conn)
    }
}

/// Open transaction; rolls back on drop unless committed
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
}

impl WriteTx {
    pub fn queries(&mut self) -> Queries<'_> {
        Queries::new(&mut self.tx)
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::Commit)
    }

    /// Settle the transaction from the outcome of the unit of work
    ///
    /// `Ok` commits, `Err` rolls back and passes the error through unchanged.
    /// Only a failing commit or rollback replaces the outcome, the latter
    /// carrying the original error alongside the rollback failure.
    pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError> + std::fmt::Display,
    {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => match self.tx.rollback().await {
                Ok(()) => Err(err),
                Err(source) => {
                    warn!(error = %source, cause = %err, "Rollback failed");
                    Err(StoreError::Rollback {
                        cause: err.to_string(),
                        source,
                    }
                    .into())
                }
            },
        }
    }
}
