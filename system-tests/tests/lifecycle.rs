// system-tests/tests/lifecycle.rs
// ============================================================================
// Module: Lifecycle Suite
// Description: Workload lifecycle scenarios over real TCP channels.
// Purpose: Run the hyrise-1 end-to-end flow against live services.
// Dependencies: suites/*, helpers
// ============================================================================

//! ## Overview
//! Aggregates the suite into one binary that shares the fleet harness.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

mod helpers;

#[path = "suites/workload_lifecycle.rs"]
mod workload_lifecycle;
