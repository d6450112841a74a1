// crates/cockpit-fleet/tests/common/mod.rs
// ============================================================================
// Module: Fleet Test Fixtures
// Description: Temporary fleets, data folders, and a gated stub driver.
// Purpose: Share setup across Fleet Manager and Workload Generator tests.
// Dependencies: cockpit-fleet, cockpit-store-sqlite, tempfile
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Shared fixtures are not used by every test binary."
)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use cockpit_contract::bodies::AddDatabaseRequest;
use cockpit_core::AtomicCounterStore;
use cockpit_core::AuditSink;
use cockpit_core::ConnectionDescriptor;
use cockpit_core::DatabaseDriver;
use cockpit_core::DatabaseId;
use cockpit_core::DriverError;
use cockpit_core::ExecutionError;
use cockpit_core::MemoryAuditSink;
use cockpit_core::QueryExecutor;
use cockpit_fleet::BenchmarkCatalog;
use cockpit_fleet::FleetManager;
use cockpit_fleet::FleetSettings;
use cockpit_store_sqlite::SqliteDriver;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fleet Fixture
// ============================================================================

pub struct FleetFixture {
    pub dir: TempDir,
    pub manager: Arc<FleetManager>,
    pub counters: Arc<AtomicCounterStore>,
    pub audit: Arc<MemoryAuditSink>,
}

impl FleetFixture {
    pub fn data_root(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    pub fn databases_root(&self) -> std::path::PathBuf {
        self.dir.path().join("databases")
    }
}

/// Small catalog: `mini` and `other` share the `nation` table.
pub fn mini_catalog() -> BenchmarkCatalog {
    BenchmarkCatalog::empty()
        .with_folder("mini", ["nation", "region"])
        .with_folder("other", ["nation"])
}

/// Fleet over the `SQLite` driver with table files for `mini` and `other`.
pub fn sqlite_fleet() -> FleetFixture {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("databases")).unwrap();
    let data = dir.path().join("data");
    write_table(
        &data,
        "mini",
        "nation",
        "CREATE TABLE nation (n_nationkey INTEGER); INSERT INTO nation VALUES (1);",
    );
    write_table(&data, "mini", "region", "CREATE TABLE region (r_regionkey INTEGER);");
    write_table(&data, "other", "nation", "CREATE TABLE nation (n_nationkey INTEGER);");
    let driver = Arc::new(SqliteDriver::new(dir.path().join("databases")));
    build(dir, driver)
}

/// Fleet over an arbitrary driver.
pub fn build(dir: TempDir, driver: Arc<dyn DatabaseDriver>) -> FleetFixture {
    let counters = Arc::new(AtomicCounterStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let sink: Arc<dyn AuditSink> = audit.clone();
    let settings = FleetSettings::new(dir.path().join("data")).with_benchmarks(mini_catalog());
    let manager = Arc::new(FleetManager::new(driver, counters.clone(), settings).with_audit(sink));
    FleetFixture {
        dir,
        manager,
        counters,
        audit,
    }
}

pub fn add_request(id: &str, workers: u32) -> AddDatabaseRequest {
    AddDatabaseRequest {
        id: DatabaseId::new(id),
        number_workers: workers,
        user: "bench".to_string(),
        password: "secret".to_string(),
        host: "localhost".to_string(),
        port: 5432,
        dbname: id.to_string(),
    }
}

pub fn descriptor(dbname: &str) -> ConnectionDescriptor {
    add_request(dbname, 1).connection()
}

pub fn write_table(data_root: &Path, folder: &str, table: &str, sql: &str) {
    let directory = data_root.join(folder);
    fs::create_dir_all(&directory).unwrap();
    fs::write(directory.join(format!("{table}.sql")), sql).unwrap();
}

pub fn write_workload(root: &Path, folder: &str, queries: &[(&str, &str)]) {
    let directory = root.join(folder);
    fs::create_dir_all(&directory).unwrap();
    for (name, sql) in queries {
        fs::write(directory.join(name), sql).unwrap();
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached within {timeout:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

// ============================================================================
// SECTION: Gated Driver
// ============================================================================

/// Gate that holds statements until opened.
#[derive(Default)]
pub struct Gate {
    closed: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    pub fn open(&self) {
        *self.closed.lock().unwrap() = false;
        self.changed.notify_all();
    }

    fn pass(&self) {
        let mut closed = self.closed.lock().unwrap();
        while *closed {
            closed = self.changed.wait(closed).unwrap();
        }
    }
}

/// Driver whose executors record statements and wait on a shared gate.
#[derive(Default)]
pub struct GatedDriver {
    pub gate: Arc<Gate>,
    pub statements: Arc<Mutex<Vec<String>>>,
    pub refuse: bool,
}

struct GatedExecutor {
    gate: Arc<Gate>,
    statements: Arc<Mutex<Vec<String>>>,
}

impl QueryExecutor for GatedExecutor {
    fn execute(&self, sql: &str) -> Result<(), ExecutionError> {
        self.gate.pass();
        self.statements.lock().unwrap().push(sql.to_string());
        if sql.contains("FAIL") {
            return Err(ExecutionError::Query(format!("rejected `{sql}`")));
        }
        Ok(())
    }
}

impl DatabaseDriver for GatedDriver {
    fn validate_connection(&self, _descriptor: &ConnectionDescriptor) -> Result<(), DriverError> {
        if self.refuse {
            return Err(DriverError::ConnectionRefused("no route to host".to_string()));
        }
        Ok(())
    }

    fn open_pool(
        &self,
        _descriptor: &ConnectionDescriptor,
        _max_connections: u32,
    ) -> Result<Arc<dyn QueryExecutor>, DriverError> {
        Ok(Arc::new(GatedExecutor {
            gate: Arc::clone(&self.gate),
            statements: Arc::clone(&self.statements),
        }))
    }
}

/// Fleet over a [`GatedDriver`] with the `mini` table files written.
pub fn gated_fleet() -> (FleetFixture, Arc<Gate>, Arc<Mutex<Vec<String>>>) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    write_table(&data, "mini", "nation", "CREATE TABLE nation (n_nationkey INTEGER);");
    write_table(&data, "mini", "region", "CREATE TABLE region (r_regionkey INTEGER);");
    write_table(&data, "other", "nation", "CREATE TABLE nation (n_nationkey INTEGER);");
    let driver = GatedDriver::default();
    let gate = Arc::clone(&driver.gate);
    let statements = Arc::clone(&driver.statements);
    (build(dir, Arc::new(driver)), gate, statements)
}
