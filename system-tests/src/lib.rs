// system-tests/src/lib.rs
// ============================================================================
// Module: Cockpit System Tests Library
// Description: Shared configuration for end-to-end scenarios.
// Purpose: Provide environment-driven settings to system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts the configuration shared by the scenario binaries in
//! `system-tests/tests`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
