// crates/cockpit-fleet/src/postgres.rs
// ============================================================================
// Module: Postgres Driver
// Description: Connection validation and r2d2 pools over the Postgres protocol.
// Purpose: Connect fleet members that speak the Postgres wire protocol.
// Dependencies: postgres, r2d2, r2d2_postgres, cockpit-core
// ============================================================================

//! ## Overview
//! Validation opens one plain connection and closes it again; no retry is
//! attempted. Pools are lazy (`min_idle = 0`) and bounded by the instance's
//! worker count, so a registered instance holds between zero and
//! `number_workers` connections. Dropping an executor closes its pooled
//! clients on the dropping thread, which must not be an async runtime worker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use cockpit_core::ConnectionDescriptor;
use cockpit_core::DatabaseDriver;
use cockpit_core::DriverError;
use cockpit_core::ExecutionError;
use cockpit_core::QueryExecutor;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Postgres protocol driver.
#[derive(Debug, Clone)]
pub struct PostgresDriver {
    /// Connect timeout applied to validation and pooled connections.
    connect_timeout: Duration,
}

impl PostgresDriver {
    /// Creates a driver with the given connect timeout.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
        }
    }

    /// Builds the client configuration of `descriptor`.
    fn config(&self, descriptor: &ConnectionDescriptor) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&descriptor.host)
            .port(descriptor.port)
            .user(&descriptor.user)
            .password(&descriptor.password)
            .dbname(&descriptor.dbname)
            .connect_timeout(self.connect_timeout);
        config
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS))
    }
}

impl DatabaseDriver for PostgresDriver {
    fn validate_connection(&self, descriptor: &ConnectionDescriptor) -> Result<(), DriverError> {
        let client = self
            .config(descriptor)
            .connect(NoTls)
            .map_err(|err| DriverError::ConnectionRefused(err.to_string()))?;
        client.close().map_err(|err| DriverError::ConnectionRefused(err.to_string()))
    }

    fn open_pool(
        &self,
        descriptor: &ConnectionDescriptor,
        max_connections: u32,
    ) -> Result<Arc<dyn QueryExecutor>, DriverError> {
        let manager = PostgresConnectionManager::new(self.config(descriptor), NoTls);
        let pool = Pool::builder()
            .max_size(max_connections.max(1))
            .min_idle(Some(0))
            .connection_timeout(self.connect_timeout)
            .build(manager)
            .map_err(|err| DriverError::Pool(err.to_string()))?;
        Ok(Arc::new(PostgresExecutor {
            pool,
        }))
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Statement executor over a bounded r2d2 pool.
pub struct PostgresExecutor {
    /// Connection pool.
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl QueryExecutor for PostgresExecutor {
    fn execute(&self, sql: &str) -> Result<(), ExecutionError> {
        let mut client =
            self.pool.get().map_err(|err| ExecutionError::Connection(err.to_string()))?;
        client.batch_execute(sql).map_err(|err| ExecutionError::Query(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
