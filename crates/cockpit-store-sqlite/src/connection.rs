// crates/cockpit-store-sqlite/src/connection.rs
// ============================================================================
// Module: SQLite Connections
// Description: Connection opening, pragmas, and path checks.
// Purpose: Open every SQLite file the same way with the same limits.
// Dependencies: rusqlite, thiserror
// ============================================================================

//! ## Overview
//! Shared helpers for opening `SQLite` files: path safety checks, parent
//! directory creation, and pragmas that make concurrent writers wait instead
//! of failing immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Busy timeout applied to every connection (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store path or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a database path for safety limits.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] when the path is empty, overlong, or
/// names a directory.
pub fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Creates the parent directory of `path` when missing.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Io`] when the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Opens a read-write connection, creating the file when missing.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] when the file cannot be opened.
pub fn open_connection(path: &Path) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)?;
    apply_pragmas(&connection)?;
    Ok(connection)
}

/// Applies WAL journaling and the busy timeout.
fn apply_pragmas(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA journal_mode = wal;")?;
    connection.execute_batch("PRAGMA synchronous = normal;")?;
    connection.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}
