// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Fleet harness and call journal shared by scenario suites.
// Purpose: Start real services on ephemeral ports and observe channel traffic.
// Dependencies: system-tests, cockpit-cli, cockpit-gateway
// ============================================================================

//! ## Overview
//! [`harness::FleetHarness`] runs a backend and one instance agent over
//! TCP. Gateway channels are wrapped in [`journal::RecordingChannel`] so
//! scenarios can assert the exact order of issued commands.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod harness;
pub mod journal;
