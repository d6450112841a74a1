// crates/cockpit-config/src/lib.rs
// ============================================================================
// Module: Cockpit Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for cockpit.toml semantics.
// Dependencies: cockpit-core, serde, toml
// ============================================================================

//! ## Overview
//! `cockpit-config` defines the configuration model shared by the gateway,
//! the backend services, and the instance agent. Loading is strict and fails
//! closed on oversize files, bad paths, unknown fields, and invalid values.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
