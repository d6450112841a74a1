// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Typed access to system-test environment settings.
// Purpose: Let CI widen timeouts and keep scenario artifacts.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Settings are read from `COCKPIT_SYSTEM_TEST_*` environment variables.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::SystemTestConfig;
pub use env::SystemTestEnv;
pub use env::read_env_strict;
