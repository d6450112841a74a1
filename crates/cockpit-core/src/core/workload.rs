// crates/cockpit-core/src/core/workload.rs
// ============================================================================
// Module: Cockpit Workload Tasks
// Description: Query tasks produced by the workload generator.
// Purpose: Share the task shape between the generator and fleet workers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`QueryTask`] is one statement plus the tags the worker reports with it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One query scheduled for execution on every running instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTask {
    /// Statement text.
    pub sql: String,
    /// Benchmark (workload folder) the statement came from.
    pub benchmark: String,
    /// Query number within the benchmark.
    pub query_no: String,
}
