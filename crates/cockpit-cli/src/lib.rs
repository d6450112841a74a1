// crates/cockpit-cli/src/lib.rs
// ============================================================================
// Module: Cockpit CLI Library
// Description: Process runtimes started by the `cockpit` binary.
// Purpose: Expose service wiring so it can be started from tests.
// Dependencies: cockpit-agent, cockpit-fleet, cockpit-store-sqlite
// ============================================================================

//! ## Overview
//! The binary is a thin dispatcher. Anything that binds sockets or spawns
//! threads lives in [`runtime`] so integration tests can start the same
//! services on ephemeral ports.

pub mod runtime;

pub use runtime::AgentRuntime;
pub use runtime::BackendRuntime;
pub use runtime::RuntimeError;
pub use runtime::audit_sink;
pub use runtime::counter_store;
