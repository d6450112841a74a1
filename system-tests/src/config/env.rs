// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed settings for system tests.
// Purpose: Parse overrides strictly so a typo fails the run instead of hiding.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every variable is optional. A variable that is set must be valid UTF-8,
//! non-empty, and well-formed; anything else is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys read by system tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Directory scenario fleets are created under (default: a temp dir).
    RunRoot,
    /// Lower bound, in seconds, for every scenario wait.
    TimeoutSeconds,
    /// Keep scenario directories after the run (`true`/`false` or `1`/`0`).
    KeepArtifacts,
}

impl SystemTestEnv {
    /// Returns the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "COCKPIT_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "COCKPIT_SYSTEM_TEST_TIMEOUT_SEC",
            Self::KeepArtifacts => "COCKPIT_SYSTEM_TEST_KEEP_ARTIFACTS",
        }
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// System-test settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Parent directory for scenario fleets.
    pub run_root: Option<PathBuf>,
    /// Minimum wait applied to every scenario deadline.
    pub timeout: Option<Duration>,
    /// Keep scenario directories after the run.
    pub keep_artifacts: bool,
}

impl SystemTestConfig {
    /// Loads settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable that is malformed.
    pub fn load() -> Result<Self, String> {
        let run_root = read_set(SystemTestEnv::RunRoot)?.map(PathBuf::from);
        let timeout = read_set(SystemTestEnv::TimeoutSeconds)?
            .map(|raw| parse_seconds(SystemTestEnv::TimeoutSeconds, &raw))
            .transpose()?;
        let keep_artifacts = read_set(SystemTestEnv::KeepArtifacts)?
            .map(|raw| parse_flag(SystemTestEnv::KeepArtifacts, &raw))
            .transpose()?
            .unwrap_or(false);
        Ok(Self {
            run_root,
            timeout,
            keep_artifacts,
        })
    }

    /// Returns `requested`, raised to the configured minimum when one is set.
    #[must_use]
    pub fn wait(&self, requested: Duration) -> Duration {
        self.timeout.map_or(requested, |floor| requested.max(floor))
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the value is not valid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads `key`, rejecting blank values.
fn read_set(key: SystemTestEnv) -> Result<Option<String>, String> {
    let name = key.as_str();
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        other => Ok(other),
    }
}

/// Parses a positive number of seconds.
fn parse_seconds(key: SystemTestEnv, raw: &str) -> Result<Duration, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(format!("{} must be greater than zero", key.as_str())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("{} must be a positive integer number of seconds", key.as_str())),
    }
}

/// Parses `true`/`false`/`1`/`0`.
fn parse_flag(key: SystemTestEnv, raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("{} must be 1, 0, true, or false", key.as_str())),
    }
}
