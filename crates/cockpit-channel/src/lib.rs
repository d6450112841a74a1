// crates/cockpit-channel/src/lib.rs
// ============================================================================
// Module: Cockpit Channel Library
// Description: Synchronous, schema-validated control channels over TCP.
// Purpose: Carry one request and one response at a time between processes.
// Dependencies: cockpit-contract, cockpit-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A control channel is strictly lock-step: one request, one response, in
//! order. [`ControlChannel`] enforces this with an exclusive lease around a
//! single connection and validates every response before returning it.
//! A transport failure poisons the connection; the next call rebuilds it.
//! [`ControlServer`] accepts connections and funnels every request into one
//! dispatch thread so command handling is sequential.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod error;
pub mod framing;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ChannelSettings;
pub use client::CommandChannel;
pub use client::ControlChannel;
pub use error::ChannelError;
pub use error::UnavailableKind;
pub use server::CommandHandler;
pub use server::ControlServer;
pub use server::ServerHandle;
pub use server::ServerSettings;
