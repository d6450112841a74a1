// crates/cockpit-core/src/runtime/audit.rs
// ============================================================================
// Module: Cockpit Audit Logging
// Description: Structured audit events for channels, counters, and workflows.
// Purpose: Emit JSON-lines audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Components report what they did through an [`AuditSink`]. Sinks serialize
//! events as one JSON object per line. Recording never fails the caller:
//! serialization and write errors are dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

use crate::core::DatabaseId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Returns the current unix time in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Control channel audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Logical channel name.
    pub channel: String,
    /// Command issued, when the event concerns a call.
    pub command: Option<String>,
    /// Response status, when a response was received.
    pub status: Option<u16>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Call duration in milliseconds.
    pub elapsed_ms: Option<u128>,
    /// Free-form detail.
    pub detail: Option<String>,
}

impl ChannelAuditEvent {
    /// Creates a call event.
    #[must_use]
    pub fn call(
        channel: &str,
        command: &str,
        status: Option<u16>,
        error_kind: Option<&'static str>,
        elapsed_ms: u128,
    ) -> Self {
        Self {
            event: "channel_call",
            timestamp_ms: now_ms(),
            channel: channel.to_string(),
            command: Some(command.to_string()),
            status,
            error_kind,
            elapsed_ms: Some(elapsed_ms),
            detail: None,
        }
    }

    /// Creates a connection rebuild event.
    #[must_use]
    pub fn rebuild(channel: &str, reason: &str) -> Self {
        Self {
            event: "channel_rebuild",
            timestamp_ms: now_ms(),
            channel: channel.to_string(),
            command: None,
            status: None,
            error_kind: None,
            elapsed_ms: None,
            detail: Some(reason.to_string()),
        }
    }
}

/// Counter flush audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct FlushAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Database the counter belongs to.
    pub database_id: DatabaseId,
    /// Flushed epoch index, when the flush succeeded.
    pub epoch: Option<u64>,
    /// Published throughput, when the flush succeeded.
    pub throughput: Option<u64>,
    /// Error message, when the flush failed.
    pub error: Option<String>,
}

impl FlushAuditEvent {
    /// Creates a successful flush event.
    #[must_use]
    pub fn flushed(database_id: DatabaseId, epoch: u64, throughput: u64) -> Self {
        Self {
            event: "counter_flush",
            timestamp_ms: now_ms(),
            database_id,
            epoch: Some(epoch),
            throughput: Some(throughput),
            error: None,
        }
    }

    /// Creates a failed flush event.
    #[must_use]
    pub fn failed(database_id: DatabaseId, error: String) -> Self {
        Self {
            event: "counter_flush",
            timestamp_ms: now_ms(),
            database_id,
            epoch: None,
            throughput: None,
            error: Some(error),
        }
    }
}

/// Fleet registry audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Affected database, when the action targets one.
    pub database_id: Option<DatabaseId>,
    /// Registry action label.
    pub action: &'static str,
    /// Whether the action succeeded.
    pub ok: bool,
    /// Failure detail.
    pub detail: Option<String>,
}

impl RegistryAuditEvent {
    /// Creates a registry event.
    #[must_use]
    pub fn new(
        database_id: Option<DatabaseId>,
        action: &'static str,
        ok: bool,
        detail: Option<String>,
    ) -> Self {
        Self {
            event: "registry_change",
            timestamp_ms: now_ms(),
            database_id,
            action,
            ok,
            detail,
        }
    }
}

/// Workflow step audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Workflow name.
    pub workflow: &'static str,
    /// Zero-based step index.
    pub step: usize,
    /// Command issued by the step.
    pub command: String,
    /// Whether the step succeeded.
    pub ok: bool,
    /// Failure detail.
    pub detail: Option<String>,
}

impl WorkflowAuditEvent {
    /// Creates a workflow step event.
    #[must_use]
    pub fn new(
        workflow: &'static str,
        step: usize,
        command: &str,
        ok: bool,
        detail: Option<String>,
    ) -> Self {
        Self {
            event: "workflow_step",
            timestamp_ms: now_ms(),
            workflow,
            step,
            command: command.to_string(),
            ok,
            detail,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for control plane events.
pub trait AuditSink: Send + Sync {
    /// Record a control channel event.
    fn record_channel(&self, _event: &ChannelAuditEvent) {}

    /// Record a counter flush event.
    fn record_flush(&self, _event: &FlushAuditEvent) {}

    /// Record a fleet registry event.
    fn record_registry(&self, _event: &RegistryAuditEvent) {}

    /// Record a workflow step event.
    fn record_workflow(&self, _event: &WorkflowAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one event to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_channel(&self, event: &ChannelAuditEvent) {
        Self::emit(event);
    }

    fn record_flush(&self, event: &FlushAuditEvent) {
        Self::emit(event);
    }

    fn record_registry(&self, event: &RegistryAuditEvent) {
        Self::emit(event);
    }

    fn record_workflow(&self, event: &WorkflowAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one event to the file.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_channel(&self, event: &ChannelAuditEvent) {
        self.emit(event);
    }

    fn record_flush(&self, event: &FlushAuditEvent) {
        self.emit(event);
    }

    fn record_registry(&self, event: &RegistryAuditEvent) {
        self.emit(event);
    }

    fn record_workflow(&self, event: &WorkflowAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {}

/// Audit sink that keeps events in memory as JSON values.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<Value>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded events whose `event` field equals `name`.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event.get("event").and_then(Value::as_str) == Some(name))
            .collect()
    }

    /// Stores one event.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(value) = serde_json::to_value(event)
            && let Ok(mut events) = self.events.lock()
        {
            events.push(value);
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_channel(&self, event: &ChannelAuditEvent) {
        self.emit(event);
    }

    fn record_flush(&self, event: &FlushAuditEvent) {
        self.emit(event);
    }

    fn record_registry(&self, event: &RegistryAuditEvent) {
        self.emit(event);
    }

    fn record_workflow(&self, event: &WorkflowAuditEvent) {
        self.emit(event);
    }
}
