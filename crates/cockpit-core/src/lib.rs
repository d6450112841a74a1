// crates/cockpit-core/src/lib.rs
// ============================================================================
// Module: Cockpit Core Library
// Description: Public API surface for the Cockpit fleet control plane core.
// Purpose: Expose fleet types, control messages, counters, and interfaces.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Cockpit core holds the types every other Cockpit crate agrees on: database
//! instance descriptors, the control message envelope, aggregation windows,
//! and the throughput counter. Backends plug in through the traits in
//! [`interfaces`]; in-process implementations live in [`runtime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CounterError;
pub use interfaces::CounterStore;
pub use interfaces::DatabaseDriver;
pub use interfaces::DriverError;
pub use interfaces::ExecutionError;
pub use interfaces::QueryExecutor;
pub use interfaces::TimeSeriesError;
pub use interfaces::TimeSeriesStore;
pub use runtime::AtomicCounterStore;
pub use runtime::AuditSink;
pub use runtime::ChannelAuditEvent;
pub use runtime::EpochReport;
pub use runtime::FileAuditSink;
pub use runtime::FlushAuditEvent;
pub use runtime::InMemoryTimeSeries;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::RegistryAuditEvent;
pub use runtime::StderrAuditSink;
pub use runtime::ThroughputCounter;
pub use runtime::WorkflowAuditEvent;
