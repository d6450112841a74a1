// crates/cockpit-store-sqlite/tests/driver.rs
// ============================================================================
// Module: SQLite Driver Tests
// Description: Connection validation and pooled statement execution.
// Purpose: Validate the local-file driver behind the fleet driver seam.
// Dependencies: cockpit-core, cockpit-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Validation refusal, lazy bounded pools, and statement execution through
//! the `SQLite` driver.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use cockpit_core::ConnectionDescriptor;
use cockpit_core::DatabaseDriver;
use cockpit_core::DriverError;
use cockpit_core::ExecutionError;
use cockpit_core::QueryExecutor;
use cockpit_store_sqlite::SqliteDriver;
use cockpit_store_sqlite::SqliteExecutor;
use rusqlite::Connection;
use tempfile::TempDir;

fn descriptor(dbname: &str) -> ConnectionDescriptor {
    ConnectionDescriptor {
        host: "localhost".to_string(),
        port: 5432,
        user: "bench".to_string(),
        password: "secret".to_string(),
        dbname: dbname.to_string(),
    }
}

#[test]
fn missing_root_refuses_connection() {
    let dir = TempDir::new().unwrap();
    let driver = SqliteDriver::new(dir.path().join("absent"));
    let err = driver.validate_connection(&descriptor("hyrise")).unwrap_err();
    assert!(matches!(err, DriverError::ConnectionRefused(_)));
    assert!(err.to_string().starts_with("Database connection refused"));
}

#[test]
fn path_like_database_name_is_refused() {
    let dir = TempDir::new().unwrap();
    let driver = SqliteDriver::new(dir.path());
    for name in ["", "..", "a/b", "a\\b"] {
        let err = driver.validate_connection(&descriptor(name)).unwrap_err();
        assert!(matches!(err, DriverError::ConnectionRefused(_)), "{name}");
    }
}

#[test]
fn validation_creates_database_file() {
    let dir = TempDir::new().unwrap();
    let driver = SqliteDriver::new(dir.path());
    driver.validate_connection(&descriptor("hyrise")).unwrap();
    assert!(dir.path().join("hyrise.sqlite3").exists());
}

#[test]
fn pool_opens_connections_lazily_and_stays_bounded() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteExecutor::open(&dir.path().join("db.sqlite3"), 2).unwrap();
    assert_eq!(executor.capacity(), 2);
    assert_eq!(executor.open_connections(), 0);
    for _ in 0 .. 5 {
        executor.execute("SELECT 1").unwrap();
    }
    assert_eq!(executor.open_connections(), 2);
}

#[test]
fn zero_sized_pool_still_executes() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteExecutor::open(&dir.path().join("db.sqlite3"), 0).unwrap();
    assert_eq!(executor.capacity(), 1);
    executor.execute("SELECT 1").unwrap();
}

#[test]
fn statements_and_batches_execute_through_the_pool() {
    let dir = TempDir::new().unwrap();
    let driver = SqliteDriver::new(dir.path());
    let pool = driver.open_pool(&descriptor("bench"), 3).unwrap();
    pool.execute("CREATE TABLE region (r_regionkey INTEGER, r_name TEXT);\n").unwrap();
    pool.execute(
        "INSERT INTO region VALUES (0, 'AFRICA');\nINSERT INTO region VALUES (1, 'AMERICA');\n",
    )
    .unwrap();
    pool.execute("SELECT r_name FROM region ORDER BY r_regionkey").unwrap();

    let check = Connection::open(dir.path().join("bench.sqlite3")).unwrap();
    let count: i64 = check.query_row("SELECT COUNT(*) FROM region", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 2);
}

#[test]
fn script_statements_see_tables_created_earlier_in_the_script() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteExecutor::open(&dir.path().join("db.sqlite3"), 1).unwrap();
    executor
        .execute(
            "CREATE TABLE nation (n_nationkey INTEGER, n_name TEXT);\n\
             INSERT INTO nation VALUES (0, 'ALGERIA');\n\
             INSERT INTO nation VALUES (1, 'ARGENTINA');\n\
             SELECT n_name FROM nation;\n",
        )
        .unwrap();

    let check = Connection::open(dir.path().join("db.sqlite3")).unwrap();
    let count: i64 = check.query_row("SELECT COUNT(*) FROM nation", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 2);
}

#[test]
fn script_stops_at_the_first_failing_statement() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteExecutor::open(&dir.path().join("db.sqlite3"), 1).unwrap();
    let script = "CREATE TABLE part (p_partkey INTEGER); \
                  INSERT INTO missing VALUES (1); \
                  CREATE TABLE late (x INTEGER);";
    let err = executor.execute(script).unwrap_err();
    assert!(matches!(err, ExecutionError::Query(_)));

    let check = Connection::open(dir.path().join("db.sqlite3")).unwrap();
    let tables: Vec<String> = check
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(tables, vec!["part".to_string()]);
}

#[test]
fn empty_script_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteExecutor::open(&dir.path().join("db.sqlite3"), 1).unwrap();
    executor.execute("  -- nothing to run\n").unwrap();
}

#[test]
fn failing_statement_reports_query_error() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteExecutor::open(&dir.path().join("db.sqlite3"), 1).unwrap();
    let err = executor.execute("SELECT * FROM missing_table").unwrap_err();
    assert!(matches!(err, ExecutionError::Query(_)));
    executor.execute("SELECT 1").unwrap();
}
