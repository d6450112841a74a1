// crates/cockpit-core/src/core/mod.rs
// ============================================================================
// Module: Cockpit Core Types
// Description: Canonical fleet, message, metric, and time structures.
// Purpose: Provide stable, serializable types shared across Cockpit crates.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for what travels over control
//! channels and what the gateway reads back from the time-series store.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod instance;
pub mod message;
pub mod metrics;
pub mod time;
pub mod workload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::DataFolder;
pub use identifiers::DatabaseId;
pub use identifiers::PluginName;
pub use instance::ConnectionDescriptor;
pub use instance::DatabaseInstance;
pub use instance::InstanceStatus;
pub use instance::LoadedTable;
pub use instance::PluginActivation;
pub use instance::WorkerPoolStatus;
pub use message::ControlMessage;
pub use message::MessageHeader;
pub use message::StatusCode;
pub use message::empty_body;
pub use metrics::AggregateKind;
pub use metrics::AggregateQuery;
pub use metrics::AggregateRow;
pub use metrics::MetricSample;
pub use metrics::SnapshotRecord;
pub use metrics::TagSet;
pub use time::AggregationWindow;
pub use time::Clock;
pub use time::Epoch;
pub use time::ManualClock;
pub use time::SystemClock;
pub use workload::QueryTask;
