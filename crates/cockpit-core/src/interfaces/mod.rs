// crates/cockpit-core/src/interfaces/mod.rs
// ============================================================================
// Module: Cockpit Interfaces
// Description: Backend-agnostic traits for counters, databases, and metrics.
// Purpose: Define the seams where stores and drivers plug into the control plane.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces isolate the control plane from concrete backends. Counter
//! stores may be process-local or shared across worker processes; drivers
//! speak to the benchmarked databases; time-series stores serve the
//! aggregator's read path. All implementations must be thread safe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::AggregateQuery;
use crate::core::AggregateRow;
use crate::core::ConnectionDescriptor;
use crate::core::DatabaseId;
use crate::core::SnapshotRecord;

// ============================================================================
// SECTION: Counter Store
// ============================================================================

/// Counter store errors.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Backing store I/O failed.
    #[error("counter store io error: {0}")]
    Io(String),
    /// Backing store reported an error.
    #[error("counter store error: {0}")]
    Store(String),
}

/// Shared per-database counter with atomic increment and exchange.
///
/// # Invariants
/// - `increment` and `exchange_zero` are mutually atomic: every increment is
///   observed by exactly one exchange or by the final remainder.
pub trait CounterStore: Send + Sync {
    /// Adds one to the counter and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError`] when the store cannot be updated.
    fn increment(&self, database: &DatabaseId) -> Result<u64, CounterError>;

    /// Replaces the counter with zero and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError`] when the store cannot be updated.
    fn exchange_zero(&self, database: &DatabaseId) -> Result<u64, CounterError>;

    /// Returns the live value without resetting it.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError`] when the store cannot be read.
    fn peek(&self, database: &DatabaseId) -> Result<u64, CounterError>;
}

impl<T: CounterStore + ?Sized> CounterStore for Arc<T> {
    fn increment(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        (**self).increment(database)
    }

    fn exchange_zero(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        (**self).exchange_zero(database)
    }

    fn peek(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        (**self).peek(database)
    }
}

// ============================================================================
// SECTION: Query Execution
// ============================================================================

/// Query execution errors reported by the database.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// No connection could be obtained.
    #[error("connection unavailable: {0}")]
    Connection(String),
    /// The database rejected the statement.
    #[error("query failed: {0}")]
    Query(String),
}

/// Executes statements against one bound database.
pub trait QueryExecutor: Send + Sync {
    /// Runs one statement to completion, discarding any result rows.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the statement fails.
    fn execute(&self, sql: &str) -> Result<(), ExecutionError>;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for Arc<T> {
    fn execute(&self, sql: &str) -> Result<(), ExecutionError> {
        (**self).execute(sql)
    }
}

// ============================================================================
// SECTION: Database Driver
// ============================================================================

/// Database driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Connection validation failed.
    #[error("Database connection refused: {0}")]
    ConnectionRefused(String),
    /// Pool construction failed.
    #[error("connection pool error: {0}")]
    Pool(String),
}

/// Opens validated, bounded connection pools for fleet instances.
pub trait DatabaseDriver: Send + Sync {
    /// Connects once and disconnects, proving the descriptor is usable.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ConnectionRefused`] when the database is unreachable
    /// or rejects the credentials.
    fn validate_connection(&self, descriptor: &ConnectionDescriptor) -> Result<(), DriverError>;

    /// Creates a pool holding between zero and `max_connections` connections.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Pool`] when the pool cannot be created.
    fn open_pool(
        &self,
        descriptor: &ConnectionDescriptor,
        max_connections: u32,
    ) -> Result<Arc<dyn QueryExecutor>, DriverError>;
}

// ============================================================================
// SECTION: Time-Series Store
// ============================================================================

/// Time-series read errors.
#[derive(Debug, Error)]
pub enum TimeSeriesError {
    /// Transport to the store failed.
    #[error("time-series transport error: {0}")]
    Transport(String),
    /// The store returned an unreadable payload.
    #[error("time-series response invalid: {0}")]
    Invalid(String),
    /// The store reported an error.
    #[error("time-series store error: {0}")]
    Store(String),
}

/// Read contract consumed by the metrics aggregator.
pub trait TimeSeriesStore: Send + Sync {
    /// Runs a windowed count/mean query.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSeriesError`] when the query fails.
    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, TimeSeriesError>;

    /// Returns the latest record of a measurement, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSeriesError`] when the query fails.
    fn latest(
        &self,
        database: &DatabaseId,
        measurement: &str,
    ) -> Result<Option<SnapshotRecord>, TimeSeriesError>;

    /// Returns up to `limit` records of a measurement, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSeriesError`] when the query fails.
    fn recent(
        &self,
        database: &DatabaseId,
        measurement: &str,
        limit: usize,
    ) -> Result<Vec<SnapshotRecord>, TimeSeriesError>;
}
