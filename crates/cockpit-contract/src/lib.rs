// crates/cockpit-contract/src/lib.rs
// ============================================================================
// Module: Cockpit Contract Library
// Description: Control channel command catalog and response contracts.
// Purpose: Define every command, its wire body, and its response schema once.
// Dependencies: cockpit-core, jsonschema, serde, serde_json
// ============================================================================

//! ## Overview
//! The contract crate is the single source of truth for what may travel over
//! the Fleet Manager, Workload Generator, and Instance Agent channels.
//! Servers decode request bodies with the types in [`bodies`]; callers check
//! every response with a [`ResponseValidator`] built from [`schemas`] before
//! trusting it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bodies;
pub mod commands;
pub mod schemas;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use commands::AgentCommand;
pub use commands::ChannelKind;
pub use commands::FleetCommand;
pub use commands::GeneratorCommand;
pub use validator::ContractError;
pub use validator::ResponseValidator;
