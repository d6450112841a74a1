// crates/cockpit-fleet/src/lib.rs
// ============================================================================
// Module: Cockpit Fleet Library
// Description: Fleet Manager and Workload Generator backend services.
// Purpose: Own the registered databases, their worker pools, and load generation.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, postgres, r2d2
// ============================================================================

//! ## Overview
//! The [`FleetManager`] is the registry of benchmarked databases. Each
//! instance owns a validated, bounded connection pool and a worker pool that
//! executes queued [`cockpit_core::QueryTask`]s and counts successes into the
//! shared counter store. Plugins and benchmark data are tracked per
//! instance.
//!
//! The [`WorkloadGenerator`] replays a workload folder at a fixed frequency
//! into a [`WorkloadSink`], which the backend wires to the Fleet Manager.
//!
//! [`FleetService`] and [`GeneratorService`] expose both over control
//! channels.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod error;
pub mod generator;
pub mod manager;
pub mod postgres;
pub mod service;
pub mod workers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::BenchmarkCatalog;
pub use catalog::PluginCatalog;
pub use catalog::PluginSpec;
pub use error::FleetError;
pub use error::GeneratorError;
pub use generator::GeneratorService;
pub use generator::MAX_FREQUENCY;
pub use generator::WorkloadGenerator;
pub use generator::WorkloadSink;
pub use generator::load_workload;
pub use manager::FleetManager;
pub use manager::FleetSettings;
pub use postgres::PostgresDriver;
pub use postgres::PostgresExecutor;
pub use service::FleetRequest;
pub use service::FleetService;
pub use workers::MAX_QUEUE_LENGTH;
pub use workers::WorkerPool;
