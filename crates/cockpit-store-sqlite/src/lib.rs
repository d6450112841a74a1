// crates/cockpit-store-sqlite/src/lib.rs
// ============================================================================
// Module: Cockpit SQLite Store Library
// Description: SQLite-backed counter store and database driver.
// Purpose: Share throughput counters across processes and run local fleets.
// Dependencies: cockpit-core, rusqlite, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteCounterStore`] keeps per-database throughput counters in a shared
//! file so worker processes and the instance agent observe the same value.
//! [`SqliteDriver`] implements the fleet's database driver seam over local
//! `SQLite` files, used for local fleets and tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod connection;
pub mod counter;
pub mod driver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use connection::SqliteStoreError;
pub use counter::SqliteCounterStore;
pub use driver::SqliteDriver;
pub use driver::SqliteExecutor;
