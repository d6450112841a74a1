// crates/cockpit-agent/src/lib.rs
// ============================================================================
// Module: Cockpit Instance Agent Library
// Description: Command dispatch and throughput reporting for one database.
// Purpose: Execute queries for one instance and publish per-epoch throughput.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! An instance agent binds to exactly one database. [`InstanceAgent`] handles
//! commands one at a time behind a control server; a [`FlushScheduler`]
//! thread exchanges the throughput counter for zero once per epoch and
//! publishes the exchanged value as the last completed epoch's throughput.
//! The storage snapshot is produced elsewhere and only read here, through a
//! [`StorageSnapshotCell`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod agent;
pub mod scheduler;
pub mod storage;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use agent::AgentError;
pub use agent::AgentRequest;
pub use agent::InstanceAgent;
pub use scheduler::FlushScheduler;
pub use storage::StorageSnapshotCell;
