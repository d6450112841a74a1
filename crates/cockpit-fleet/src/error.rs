// crates/cockpit-fleet/src/error.rs
// ============================================================================
// Module: Fleet Errors
// Description: Failure kinds of Fleet Manager and Workload Generator commands.
// Purpose: Map every backend failure to one stable wire status.
// Dependencies: cockpit-core, thiserror
// ============================================================================

//! ## Overview
//! Backend services never panic on bad input. Each failure is one of these
//! variants, rendered into a failure reply with [`FleetError::status`] or
//! [`GeneratorError::status`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use cockpit_core::DriverError;
use cockpit_core::StatusCode;
use thiserror::Error;

// ============================================================================
// SECTION: Fleet Manager
// ============================================================================

/// Fleet Manager errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Connection validation failed; nothing was registered.
    #[error("{0}")]
    ConnectionInvalid(String),
    /// A database with the same id is already registered.
    #[error("database `{0}` already exists")]
    Conflict(String),
    /// The referenced database is not registered.
    #[error("database `{0}` not found")]
    NotFound(String),
    /// Pool or driver failure after validation.
    #[error("driver error: {0}")]
    Driver(String),
    /// The database is busy loading or deleting data.
    #[error("database `{0}` is blocked")]
    Blocked(String),
    /// Unknown plugin, setting, or inactive plugin.
    #[error("{0}")]
    Plugin(String),
    /// Unknown data folder, missing files, or failed statements.
    #[error("{0}")]
    Data(String),
    /// Request body did not decode.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Command name not recognized.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// Internal failure (poisoned lock, thread spawn, encoding).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Returns the wire status code reported for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownCommand(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::SERVER_ERROR,
            Self::ConnectionInvalid(_)
            | Self::Conflict(_)
            | Self::NotFound(_)
            | Self::Driver(_)
            | Self::Blocked(_)
            | Self::Plugin(_)
            | Self::Data(_)
            | Self::InvalidParams(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<DriverError> for FleetError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::ConnectionRefused(_) => Self::ConnectionInvalid(err.to_string()),
            DriverError::Pool(message) => Self::Driver(message),
        }
    }
}

// ============================================================================
// SECTION: Workload Generator
// ============================================================================

/// Workload Generator errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// A workload is already being generated.
    #[error("workload `{0}` is already running")]
    AlreadyRunning(String),
    /// The workload folder is unknown, unreadable, or empty.
    #[error("{0}")]
    Workload(String),
    /// Frequency outside the accepted range.
    #[error("frequency {0} outside 1..={max}", max = crate::generator::MAX_FREQUENCY)]
    Frequency(u32),
    /// Request body did not decode.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Command name not recognized.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// Internal failure (poisoned lock, thread spawn).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GeneratorError {
    /// Returns the wire status code reported for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownCommand(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::SERVER_ERROR,
            Self::AlreadyRunning(_)
            | Self::Workload(_)
            | Self::Frequency(_)
            | Self::InvalidParams(_) => StatusCode::BAD_REQUEST,
        }
    }
}
