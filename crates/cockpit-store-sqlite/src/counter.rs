// crates/cockpit-store-sqlite/src/counter.rs
// ============================================================================
// Module: SQLite Counter Store
// Description: Per-database throughput counters in a shared SQLite file.
// Purpose: Make increment and exchange-to-zero atomic across processes.
// Dependencies: cockpit-core, rusqlite
// ============================================================================

//! ## Overview
//! Each database owns one row in `counters`. Increments are single-statement
//! upserts; the exchange reads and zeroes the row inside a `BEGIN IMMEDIATE`
//! transaction, so the write lock is held before the read and no increment
//! can land between the two.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use cockpit_core::CounterError;
use cockpit_core::CounterStore;
use cockpit_core::DatabaseId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;

use crate::connection::SqliteStoreError;
use crate::connection::ensure_parent_dir;
use crate::connection::open_connection;
use crate::connection::validate_store_path;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Shared-file throughput counter store.
pub struct SqliteCounterStore {
    /// Database file path.
    path: PathBuf,
    /// Connection owned by this handle.
    connection: Mutex<Connection>,
}

impl SqliteCounterStore {
    /// Opens (or creates) the counter file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self, SqliteStoreError> {
        validate_store_path(path)?;
        ensure_parent_dir(path)?;
        let connection = open_connection(path)?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS counters (
                database_id TEXT PRIMARY KEY NOT NULL,
                value INTEGER NOT NULL DEFAULT 0
            );",
        )?;
        Ok(Self {
            path: path.to_path_buf(),
            connection: Mutex::new(connection),
        })
    }

    /// Returns the counter file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locks the connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CounterError> {
        self.connection.lock().map_err(|_| CounterError::Io("sqlite mutex poisoned".to_string()))
    }
}

impl CounterStore for SqliteCounterStore {
    fn increment(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        let connection = self.lock()?;
        let value: i64 = connection
            .query_row(
                "INSERT INTO counters (database_id, value) VALUES (?1, 1)
                 ON CONFLICT(database_id) DO UPDATE SET value = value + 1
                 RETURNING value",
                params![database.as_str()],
                |row| row.get(0),
            )
            .map_err(store_error)?;
        to_count(value)
    }

    fn exchange_zero(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        let mut connection = self.lock()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error)?;
        let value: Option<i64> = tx
            .query_row(
                "SELECT value FROM counters WHERE database_id = ?1",
                params![database.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_error)?;
        if value.is_some() {
            tx.execute(
                "UPDATE counters SET value = 0 WHERE database_id = ?1",
                params![database.as_str()],
            )
            .map_err(store_error)?;
        }
        tx.commit().map_err(store_error)?;
        to_count(value.unwrap_or(0))
    }

    fn peek(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        let connection = self.lock()?;
        let value: Option<i64> = connection
            .query_row(
                "SELECT value FROM counters WHERE database_id = ?1",
                params![database.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_error)?;
        to_count(value.unwrap_or(0))
    }
}

/// Maps an engine error to a counter error.
fn store_error(err: rusqlite::Error) -> CounterError {
    CounterError::Store(err.to_string())
}

/// Converts a stored value to a count.
fn to_count(value: i64) -> Result<u64, CounterError> {
    u64::try_from(value).map_err(|_| CounterError::Store(format!("negative counter value {value}")))
}
