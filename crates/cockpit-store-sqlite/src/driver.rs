// crates/cockpit-store-sqlite/src/driver.rs
// ============================================================================
// Module: SQLite Database Driver
// Description: Fleet database driver over local SQLite files.
// Purpose: Run fleets and workloads without a networked database server.
// Dependencies: cockpit-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteDriver`] maps a connection descriptor to `<root>/<dbname>.sqlite3`.
//! Host, port, and credentials are ignored. [`SqliteExecutor`] is a bounded
//! pool of lazily opened connections handed out round-robin. Scripts run one
//! statement at a time; rows are drained and discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use cockpit_core::ConnectionDescriptor;
use cockpit_core::DatabaseDriver;
use cockpit_core::DriverError;
use cockpit_core::ExecutionError;
use cockpit_core::QueryExecutor;
use rusqlite::Batch;
use rusqlite::Connection;
use rusqlite::fallible_iterator::FallibleIterator;

use crate::connection::SqliteStoreError;
use crate::connection::open_connection;
use crate::connection::validate_store_path;

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Driver resolving databases to files under a root directory.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    /// Directory holding database files.
    root: PathBuf,
}

impl SqliteDriver {
    /// Creates a driver rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the file path of `descriptor`'s database.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ConnectionRefused`] when the root is missing or
    /// the database name is not a plain file name.
    pub fn database_path(&self, descriptor: &ConnectionDescriptor) -> Result<PathBuf, DriverError> {
        if !self.root.is_dir() {
            return Err(DriverError::ConnectionRefused(format!(
                "database root {} does not exist",
                self.root.display()
            )));
        }
        let name = descriptor.dbname.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(DriverError::ConnectionRefused(format!("invalid database name `{name}`")));
        }
        Ok(self.root.join(format!("{name}.sqlite3")))
    }
}

impl DatabaseDriver for SqliteDriver {
    fn validate_connection(&self, descriptor: &ConnectionDescriptor) -> Result<(), DriverError> {
        let path = self.database_path(descriptor)?;
        let connection = open_connection(&path)
            .map_err(|err| DriverError::ConnectionRefused(err.to_string()))?;
        connection
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|err| DriverError::ConnectionRefused(err.to_string()))?;
        Ok(())
    }

    fn open_pool(
        &self,
        descriptor: &ConnectionDescriptor,
        max_connections: u32,
    ) -> Result<Arc<dyn QueryExecutor>, DriverError> {
        let path = self.database_path(descriptor)?;
        let executor = SqliteExecutor::open(&path, max_connections)
            .map_err(|err| DriverError::Pool(err.to_string()))?;
        Ok(Arc::new(executor))
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Bounded pool of lazily opened connections to one database file.
///
/// # Invariants
/// - At most `max_connections` connections are ever open.
pub struct SqliteExecutor {
    /// Database file path.
    path: PathBuf,
    /// Connection slots; `None` until first use.
    slots: Vec<Mutex<Option<Connection>>>,
    /// Round-robin slot cursor.
    cursor: AtomicUsize,
}

impl SqliteExecutor {
    /// Creates a pool of up to `max_connections` connections (at least one).
    ///
    /// No connection is opened until the first statement runs.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the path is unusable.
    pub fn open(path: &Path, max_connections: u32) -> Result<Self, SqliteStoreError> {
        validate_store_path(path)?;
        let size = usize::try_from(max_connections.max(1))
            .map_err(|_| SqliteStoreError::Invalid("pool size out of range".to_string()))?;
        let slots = (0 .. size).map(|_| Mutex::new(None)).collect();
        Ok(Self {
            path: path.to_path_buf(),
            slots,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the number of connections currently open.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.slots.iter().filter(|slot| slot.lock().is_ok_and(|conn| conn.is_some())).count()
    }

    /// Returns the pool capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl QueryExecutor for SqliteExecutor {
    fn execute(&self, sql: &str) -> Result<(), ExecutionError> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let Some(slot) = self.slots.get(index) else {
            return Err(ExecutionError::Connection("pool slot missing".to_string()));
        };
        let mut guard = slot
            .lock()
            .map_err(|_| ExecutionError::Connection("sqlite mutex poisoned".to_string()))?;
        if guard.is_none() {
            let connection = open_connection(&self.path)
                .map_err(|err| ExecutionError::Connection(err.to_string()))?;
            *guard = Some(connection);
        }
        let Some(connection) = guard.as_ref() else {
            return Err(ExecutionError::Connection("connection missing".to_string()));
        };
        run_statement(connection, sql)
    }
}

/// Runs every statement of `sql` in order, draining rows as it goes.
///
/// Each statement is prepared only after the previous one ran, so a script
/// may create a table and insert into it.
fn run_statement(connection: &Connection, sql: &str) -> Result<(), ExecutionError> {
    let query_error = |err: rusqlite::Error| ExecutionError::Query(err.to_string());
    let mut batch = Batch::new(connection, sql);
    while let Some(mut statement) = batch.next().map_err(query_error)? {
        let mut rows = statement.query([]).map_err(query_error)?;
        while rows.next().map_err(query_error)?.is_some() {}
    }
    Ok(())
}
