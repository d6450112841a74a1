// crates/cockpit-channel/src/client.rs
// ============================================================================
// Module: Control Channel Client
// Description: Exclusive-lease request/response client over framed TCP.
// Purpose: Issue one command at a time and return only validated responses.
// Dependencies: cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! [`ControlChannel`] owns at most one TCP connection. Every call holds the
//! lease for the full request/response exchange, so two callers can never
//! interleave frames. A transport failure or timeout drops the connection
//! and reports [`ChannelError::Unavailable`]; the call is not retried and the
//! next call reconnects from scratch.
//!
//! Responses are decoded and validated against the schema of the command
//! that was issued before they are returned.
//!
//! Security posture: responses are untrusted input until validated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufReader;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use cockpit_contract::ResponseValidator;
use cockpit_core::AuditSink;
use cockpit_core::ChannelAuditEvent;
use cockpit_core::ControlMessage;
use cockpit_core::NoopAuditSink;
use serde_json::Value;

use crate::error::ChannelError;
use crate::error::UnavailableKind;
use crate::framing::FrameError;
use crate::framing::read_frame;
use crate::framing::write_frame;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// A synchronous command channel.
///
/// # Invariants
/// - At most one call is in flight per channel at any time.
/// - A returned response has passed validation for the issued command.
pub trait CommandChannel: Send + Sync {
    /// Returns the logical channel name.
    fn name(&self) -> &str;

    /// Sends `request` and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the call fails in transport or the
    /// response violates the contract.
    fn send(&self, request: &ControlMessage) -> Result<ControlMessage, ChannelError>;
}

impl<T: CommandChannel + ?Sized> CommandChannel for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn send(&self, request: &ControlMessage) -> Result<ControlMessage, ChannelError> {
        (**self).send(request)
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Connection settings for a [`ControlChannel`].
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Logical channel name used in audit events.
    pub name: String,
    /// Peer address (`host:port`).
    pub endpoint: String,
    /// Connect, read, and write timeout.
    pub timeout: Duration,
    /// Maximum accepted response size.
    pub max_body_bytes: usize,
}

impl ChannelSettings {
    /// Creates settings with a 5 second timeout and a 1 MiB body limit.
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(5),
            max_body_bytes: 1024 * 1024,
        }
    }

    /// Returns the settings with `timeout` applied.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the settings with `max_body_bytes` applied.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Live connection halves.
struct Connection {
    /// Buffered read half.
    reader: BufReader<TcpStream>,
    /// Write half.
    writer: TcpStream,
}

/// State guarded by the channel lease.
#[derive(Default)]
struct LeaseState {
    /// Current connection, when one is open.
    connection: Option<Connection>,
    /// Reason the previous connection was dropped.
    poisoned: Option<String>,
}

/// Framed TCP control channel with an exclusive lease.
pub struct ControlChannel {
    /// Connection settings.
    settings: ChannelSettings,
    /// Response validator for this channel's command catalog.
    validator: Arc<ResponseValidator>,
    /// Exclusive lease over the connection.
    lease: Mutex<LeaseState>,
    /// Audit sink for calls and rebuilds.
    audit: Arc<dyn AuditSink>,
    /// Connections opened after a poisoning.
    rebuilds: AtomicU64,
}

impl ControlChannel {
    /// Creates a channel. No connection is opened until the first call.
    #[must_use]
    pub fn new(settings: ChannelSettings, validator: Arc<ResponseValidator>) -> Self {
        Self {
            settings,
            validator,
            lease: Mutex::new(LeaseState::default()),
            audit: Arc::new(NoopAuditSink),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Returns the channel with an audit sink attached.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Returns true when a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lease.lock().is_ok_and(|state| state.connection.is_some())
    }

    /// Returns how many connections were rebuilt after a poisoning.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Acquire)
    }

    /// Opens a new connection to the configured endpoint.
    fn connect(&self) -> Result<Connection, ChannelError> {
        let addrs = self.settings.endpoint.to_socket_addrs().map_err(|err| {
            ChannelError::Unavailable {
                kind: UnavailableKind::Connect,
                detail: format!("resolve {}: {err}", self.settings.endpoint),
            }
        })?;
        let mut last_error = format!("no address for {}", self.settings.endpoint);
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.settings.timeout) {
                Ok(stream) => return self.prepare(stream),
                Err(err) => last_error = format!("connect {addr}: {err}"),
            }
        }
        Err(ChannelError::Unavailable {
            kind: UnavailableKind::Connect,
            detail: last_error,
        })
    }

    /// Applies timeouts and splits the stream into halves.
    fn prepare(&self, stream: TcpStream) -> Result<Connection, ChannelError> {
        let transport = |err: std::io::Error| ChannelError::Unavailable {
            kind: UnavailableKind::Transport,
            detail: err.to_string(),
        };
        stream.set_read_timeout(Some(self.settings.timeout)).map_err(transport)?;
        stream.set_write_timeout(Some(self.settings.timeout)).map_err(transport)?;
        stream.set_nodelay(true).map_err(transport)?;
        let writer = stream.try_clone().map_err(transport)?;
        Ok(Connection {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Performs one framed exchange on the leased connection.
    fn exchange(&self, state: &mut LeaseState, payload: &[u8]) -> Result<Vec<u8>, ChannelError> {
        if state.connection.is_none() {
            let connection = self.connect()?;
            if let Some(reason) = state.poisoned.take() {
                self.rebuilds.fetch_add(1, Ordering::AcqRel);
                self.audit
                    .record_channel(&ChannelAuditEvent::rebuild(&self.settings.name, &reason));
            }
            state.connection = Some(connection);
        }
        let Some(connection) = state.connection.as_mut() else {
            return Err(ChannelError::Unavailable {
                kind: UnavailableKind::Transport,
                detail: "connection missing".to_string(),
            });
        };
        let outcome = write_frame(&mut connection.writer, payload).and_then(|()| {
            read_frame(&mut connection.reader, self.settings.max_body_bytes)?
                .ok_or(FrameError::Closed)
        });
        match outcome {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                state.connection = None;
                state.poisoned = Some(err.to_string());
                Err(unavailable_from_frame(err))
            }
        }
    }

    /// Decodes and validates a raw response to `command`.
    fn decode(&self, command: &str, bytes: &[u8]) -> Result<ControlMessage, ChannelError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|err| {
            ChannelError::ProtocolViolation(format!("response to `{command}` is not JSON: {err}"))
        })?;
        self.validator
            .validate(command, &value)
            .map_err(|err| ChannelError::ProtocolViolation(err.to_string()))?;
        serde_json::from_value(value).map_err(|err| {
            ChannelError::ProtocolViolation(format!("response to `{command}` undecodable: {err}"))
        })
    }
}

impl CommandChannel for ControlChannel {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn send(&self, request: &ControlMessage) -> Result<ControlMessage, ChannelError> {
        let started = Instant::now();
        let command = request.command().to_string();
        let result = serde_json::to_vec(request)
            .map_err(|err| ChannelError::Encoding(err.to_string()))
            .and_then(|payload| {
                let mut state = self.lease.lock().map_err(|_| ChannelError::Unavailable {
                    kind: UnavailableKind::Transport,
                    detail: "channel lease poisoned".to_string(),
                })?;
                self.exchange(&mut state, &payload)
            })
            .and_then(|bytes| self.decode(&command, &bytes));
        let (status, error_kind) = match &result {
            Ok(response) => (response.status().map(|status| status.as_u16()), None),
            Err(err) => (None, Some(err.kind_label())),
        };
        self.audit.record_channel(&ChannelAuditEvent::call(
            &self.settings.name,
            &command,
            status,
            error_kind,
            started.elapsed().as_millis(),
        ));
        result
    }
}

/// Maps a frame failure to an unavailability error.
fn unavailable_from_frame(err: FrameError) -> ChannelError {
    let kind = match err {
        FrameError::TimedOut => UnavailableKind::Timeout,
        FrameError::Closed => UnavailableKind::Closed,
        FrameError::Malformed(_) | FrameError::TooLarge(_) | FrameError::Io(_) => {
            UnavailableKind::Transport
        }
    };
    ChannelError::Unavailable {
        kind,
        detail: err.to_string(),
    }
}
