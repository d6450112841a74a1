// crates/cockpit-core/src/runtime/counter.rs
// ============================================================================
// Module: Throughput Counter
// Description: Per-database success counter with epoch flushes.
// Purpose: Count successful executions without losing increments to resets.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Increments and flushes go through a [`CounterStore`]. The in-process
//! [`AtomicCounterStore`] uses one `AtomicU64` per database: `fetch_add` for
//! increments and `swap(0)` for the flush exchange, so an increment racing a
//! flush lands in exactly one epoch.
//!
//! [`ThroughputCounter`] publishes the exchanged value as the throughput of
//! the last completed epoch; readers never see the live value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;

use crate::core::DatabaseId;
use crate::interfaces::CounterError;
use crate::interfaces::CounterStore;

// ============================================================================
// SECTION: Atomic Counter Store
// ============================================================================

/// Process-local counter store backed by atomics.
#[derive(Debug, Default)]
pub struct AtomicCounterStore {
    /// Counter slots keyed by database.
    slots: Mutex<BTreeMap<DatabaseId, Arc<AtomicU64>>>,
}

impl AtomicCounterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `database`, creating it on first use.
    fn slot(&self, database: &DatabaseId) -> Result<Arc<AtomicU64>, CounterError> {
        let mut guard =
            self.slots.lock().map_err(|_| CounterError::Store("mutex poisoned".to_string()))?;
        Ok(Arc::clone(guard.entry(database.clone()).or_default()))
    }
}

impl CounterStore for AtomicCounterStore {
    fn increment(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        let slot = self.slot(database)?;
        Ok(slot.fetch_add(1, Ordering::AcqRel).saturating_add(1))
    }

    fn exchange_zero(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        let slot = self.slot(database)?;
        Ok(slot.swap(0, Ordering::AcqRel))
    }

    fn peek(&self, database: &DatabaseId) -> Result<u64, CounterError> {
        let slot = self.slot(database)?;
        Ok(slot.load(Ordering::Acquire))
    }
}

// ============================================================================
// SECTION: Throughput Counter
// ============================================================================

/// Result of one counter flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochReport {
    /// Database the counter belongs to.
    pub database_id: DatabaseId,
    /// One-based index of the flushed epoch.
    pub epoch: u64,
    /// Successful executions counted in the epoch.
    pub throughput: u64,
}

/// Throughput counter of one instance agent.
///
/// # Invariants
/// - `last_epoch_throughput` only changes on [`ThroughputCounter::flush`].
pub struct ThroughputCounter {
    /// Database the counter is scoped to.
    database: DatabaseId,
    /// Shared store holding the live value.
    store: Arc<dyn CounterStore>,
    /// Value published by the most recent flush.
    last_epoch: AtomicU64,
    /// Number of completed flushes.
    epochs: AtomicU64,
}

impl ThroughputCounter {
    /// Creates a counter for `database` over `store`.
    #[must_use]
    pub fn new(database: DatabaseId, store: Arc<dyn CounterStore>) -> Self {
        Self {
            database,
            store,
            last_epoch: AtomicU64::new(0),
            epochs: AtomicU64::new(0),
        }
    }

    /// Returns the database the counter is scoped to.
    #[must_use]
    pub const fn database(&self) -> &DatabaseId {
        &self.database
    }

    /// Records one successful execution.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError`] when the store cannot be updated.
    pub fn record_success(&self) -> Result<(), CounterError> {
        self.store.increment(&self.database).map(|_| ())
    }

    /// Exchanges the live value for zero and publishes it.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError`] when the exchange fails; the published value
    /// is left unchanged in that case.
    pub fn flush(&self) -> Result<EpochReport, CounterError> {
        let throughput = self.store.exchange_zero(&self.database)?;
        self.last_epoch.store(throughput, Ordering::Release);
        let epoch = self.epochs.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        Ok(EpochReport {
            database_id: self.database.clone(),
            epoch,
            throughput,
        })
    }

    /// Returns the throughput published by the most recent flush.
    #[must_use]
    pub fn last_epoch_throughput(&self) -> u64 {
        self.last_epoch.load(Ordering::Acquire)
    }

    /// Returns the live, still accumulating value.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError`] when the store cannot be read.
    pub fn live(&self) -> Result<u64, CounterError> {
        self.store.peek(&self.database)
    }
}
