// crates/cockpit-channel/src/error.rs
// ============================================================================
// Module: Channel Errors
// Description: Failure kinds surfaced by control channel calls.
// Purpose: Keep protocol violations distinct from transport unavailability.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ChannelError::ProtocolViolation`] means a response arrived but could not
//! be trusted. [`ChannelError::Unavailable`] means no response arrived; the
//! connection was dropped and must be rebuilt before reuse. Neither is ever
//! retried by the channel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Why a channel could not complete a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableKind {
    /// The peer could not be reached.
    Connect,
    /// The call exceeded its timeout.
    Timeout,
    /// The peer closed the connection mid-call.
    Closed,
    /// Any other transport failure.
    Transport,
}

impl UnavailableKind {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for UnavailableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control channel errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The response failed decoding or schema validation.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// The call failed in transport; the connection is poisoned.
    #[error("channel unavailable ({kind}): {detail}")]
    Unavailable {
        /// Failure classification.
        kind: UnavailableKind,
        /// Failure detail.
        detail: String,
    },
    /// The request could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl ChannelError {
    /// Returns the normalized error kind label used in audit events.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::Unavailable {
                ..
            } => "channel_unavailable",
            Self::Encoding(_) => "encoding",
        }
    }
}
