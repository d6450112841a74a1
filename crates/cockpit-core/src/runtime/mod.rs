// crates/cockpit-core/src/runtime/mod.rs
// ============================================================================
// Module: Cockpit Runtime
// Description: In-process implementations of the core interfaces.
// Purpose: Provide the throughput counter, in-memory stores, and audit sinks.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime helpers are usable directly by single-process deployments and by
//! tests. Cross-process deployments swap in shared stores behind the same
//! traits.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod counter;
pub mod timeseries;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::ChannelAuditEvent;
pub use audit::FileAuditSink;
pub use audit::FlushAuditEvent;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RegistryAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::WorkflowAuditEvent;
pub use counter::AtomicCounterStore;
pub use counter::EpochReport;
pub use counter::ThroughputCounter;
pub use timeseries::InMemoryTimeSeries;
