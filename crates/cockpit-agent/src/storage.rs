// crates/cockpit-agent/src/storage.rs
// ============================================================================
// Module: Storage Snapshot Cell
// Description: Last storage snapshot handed from a collector to the agent.
// Purpose: Let `storage_data` answer without touching the database.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The cell holds the most recent snapshot published by a collector. Reads
//! clone the snapshot; a cell that was never written reads as an empty
//! object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Cell
// ============================================================================

/// Shared handle to the latest storage snapshot.
#[derive(Debug, Clone, Default)]
pub struct StorageSnapshotCell {
    /// Latest snapshot; `None` until first published.
    inner: Arc<Mutex<Option<Map<String, Value>>>>,
}

impl StorageSnapshotCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot.
    pub fn publish(&self, snapshot: Map<String, Value>) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(snapshot);
    }

    /// Returns the latest snapshot, or an empty object when none exists.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone().unwrap_or_default()
    }

    /// Returns true once a snapshot has been published.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
