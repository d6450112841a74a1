// crates/cockpit-core/src/core/message.rs
// ============================================================================
// Module: Cockpit Control Messages
// Description: Request/response envelope shared by every control channel.
// Purpose: Give requests and responses one typed shape with stable status codes.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every control channel exchanges [`ControlMessage`] values:
//! `{header: {message, status?}, body}`. Requests omit `status`; responses
//! always carry it. Failure bodies carry an optional `error` string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Status Codes
// ============================================================================

/// Result code carried in a response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(u16);

impl StatusCode {
    /// Command succeeded.
    pub const OK: Self = Self(200);
    /// Command was understood but failed.
    pub const BAD_REQUEST: Self = Self(400);
    /// Command name is not recognized.
    pub const NOT_FOUND: Self = Self(404);
    /// Server-side fault, including invalid downstream responses.
    pub const SERVER_ERROR: Self = Self(500);
    /// Command is reserved but not implemented.
    pub const NOT_IMPLEMENTED: Self = Self(501);

    /// Wraps a raw status code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the raw code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for the success code.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::OK.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Control message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Command name.
    pub message: String,
    /// Result code; absent on requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCode>,
}

/// Control channel message.
///
/// # Invariants
/// - `body` is always a JSON value; commands without a payload use `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Message header.
    pub header: MessageHeader,
    /// Command-specific payload.
    #[serde(default = "empty_body")]
    pub body: Value,
}

impl ControlMessage {
    /// Builds a request for `command` with the given body.
    #[must_use]
    pub fn request(command: impl Into<String>, body: Value) -> Self {
        Self {
            header: MessageHeader {
                message: command.into(),
                status: None,
            },
            body,
        }
    }

    /// Builds a response with an explicit status.
    #[must_use]
    pub fn reply(command: impl Into<String>, status: StatusCode, body: Value) -> Self {
        Self {
            header: MessageHeader {
                message: command.into(),
                status: Some(status),
            },
            body,
        }
    }

    /// Builds a success response.
    #[must_use]
    pub fn success(command: impl Into<String>, body: Value) -> Self {
        Self::reply(command, StatusCode::OK, body)
    }

    /// Builds a failure response with an `error` message body.
    #[must_use]
    pub fn failure(
        command: impl Into<String>,
        status: StatusCode,
        error: impl Into<String>,
    ) -> Self {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(error.into()));
        Self::reply(command, status, Value::Object(body))
    }

    /// Returns the command name.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.header.message
    }

    /// Returns the response status, if present.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.header.status
    }

    /// Returns true when the header carries the success code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.header.status.is_some_and(StatusCode::is_success)
    }

    /// Returns the `body.error` message when the remote supplied one.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Returns the empty object body.
#[must_use]
pub fn empty_body() -> Value {
    Value::Object(Map::new())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn request_omits_status_on_the_wire() {
        let message = ControlMessage::request("status", empty_body());
        let encoded = serde_json::to_value(&message).unwrap();
        assert_eq!(encoded, json!({"header": {"message": "status"}, "body": {}}));
    }

    #[test]
    fn missing_body_decodes_as_empty_object() {
        let message: ControlMessage =
            serde_json::from_value(json!({"header": {"message": "status", "status": 200}}))
                .unwrap();
        assert_eq!(message.body, json!({}));
        assert!(message.is_success());
    }

    #[test]
    fn failure_carries_error_message() {
        let message = ControlMessage::failure("add database", StatusCode::BAD_REQUEST, "taken");
        assert_eq!(message.error_message(), Some("taken"));
        assert!(!message.is_success());
    }
}
