// crates/cockpit-agent/src/agent.rs
// ============================================================================
// Module: Instance Agent
// Description: Typed command dispatch for one benchmarked database.
// Purpose: Execute queries, count successes, and answer status commands.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! Incoming messages are decoded into an [`AgentRequest`] first; dispatch is
//! an exhaustive match with one handler per command and an explicit arm for
//! unrecognized names. Every handler returns a JSON body or an
//! [`AgentError`], which is rendered into a failure reply carrying the
//! error's status code. Nothing in dispatch panics on malformed input.
//!
//! The throughput counter increments once per successfully executed
//! statement and never for a failed one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use cockpit_channel::CommandHandler;
use cockpit_contract::AgentCommand;
use cockpit_contract::bodies::QueryRequest;
use cockpit_contract::bodies::StorageResponse;
use cockpit_contract::bodies::ThroughputResponse;
use cockpit_contract::bodies::WorkloadRequest;
use cockpit_contract::bodies::WorkloadResponse;
use cockpit_core::ControlMessage;
use cockpit_core::QueryExecutor;
use cockpit_core::StatusCode;
use cockpit_core::ThroughputCounter;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::storage::StorageSnapshotCell;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Agent command errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Command name not recognized.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// Request body did not decode.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// The database rejected a statement.
    #[error("{0}")]
    Execution(String),
    /// The counter store failed after a statement succeeded.
    #[error("counter store error: {0}")]
    Counter(String),
    /// Reserved command without an implementation.
    #[error("command `{0}` is not implemented")]
    NotImplemented(String),
    /// Response body could not be encoded.
    #[error("serialization failure")]
    Serialization,
}

impl AgentError {
    /// Returns the wire status code reported for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownCommand(_) => StatusCode::NOT_FOUND,
            Self::InvalidParams(_) | Self::Execution(_) => StatusCode::BAD_REQUEST,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Counter(_) | Self::Serialization => StatusCode::SERVER_ERROR,
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Decoded agent request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRequest {
    /// Run one statement.
    Query(QueryRequest),
    /// Run statements in order.
    Workload(WorkloadRequest),
    /// Return the latest storage snapshot.
    StorageData,
    /// Return the last completed epoch's throughput.
    Throughput,
    /// Reserved.
    RuntimeInformation,
    /// Anything outside the catalog.
    Unrecognized(String),
}

impl AgentRequest {
    /// Decodes a control message into a typed request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidParams`] when a known command carries a
    /// body of the wrong shape.
    pub fn decode(message: &ControlMessage) -> Result<Self, AgentError> {
        let Some(command) = AgentCommand::parse(message.command()) else {
            return Ok(Self::Unrecognized(message.command().to_string()));
        };
        Ok(match command {
            AgentCommand::Query => Self::Query(decode_body(&message.body)?),
            AgentCommand::Workload => Self::Workload(decode_body(&message.body)?),
            AgentCommand::StorageData => Self::StorageData,
            AgentCommand::Throughput => Self::Throughput,
            AgentCommand::RuntimeInformation => Self::RuntimeInformation,
        })
    }
}

// ============================================================================
// SECTION: Agent
// ============================================================================

/// Command handler bound to one database.
pub struct InstanceAgent {
    /// Statement executor for the bound database.
    executor: Arc<dyn QueryExecutor>,
    /// Throughput counter of the bound database.
    counter: Arc<ThroughputCounter>,
    /// Latest storage snapshot.
    storage: StorageSnapshotCell,
}

impl InstanceAgent {
    /// Creates an agent over `executor`, counting into `counter`.
    #[must_use]
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        counter: Arc<ThroughputCounter>,
        storage: StorageSnapshotCell,
    ) -> Self {
        Self {
            executor,
            counter,
            storage,
        }
    }

    /// Returns the agent's throughput counter.
    #[must_use]
    pub fn counter(&self) -> &Arc<ThroughputCounter> {
        &self.counter
    }

    /// Handles a decoded request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the command fails.
    pub fn dispatch(&self, request: AgentRequest) -> Result<Value, AgentError> {
        match request {
            AgentRequest::Query(body) => self.execute_query(&body.query),
            AgentRequest::Workload(body) => self.execute_workload(&body.queries),
            AgentRequest::StorageData => encode(&StorageResponse {
                storage: self.storage.snapshot(),
            }),
            AgentRequest::Throughput => encode(&ThroughputResponse {
                throughput: self.counter.last_epoch_throughput(),
            }),
            AgentRequest::RuntimeInformation => Err(AgentError::NotImplemented(
                AgentCommand::RuntimeInformation.wire_name().to_string(),
            )),
            AgentRequest::Unrecognized(name) => Err(AgentError::UnknownCommand(name)),
        }
    }

    /// Runs one statement and counts it on success.
    fn execute_query(&self, sql: &str) -> Result<Value, AgentError> {
        self.run_counted(sql)?;
        Ok(Value::Object(serde_json::Map::new()))
    }

    /// Runs statements in order, stopping at the first failure.
    ///
    /// Statements that succeeded before the failure stay counted.
    fn execute_workload(&self, queries: &[String]) -> Result<Value, AgentError> {
        let mut executed: u64 = 0;
        for (index, sql) in queries.iter().enumerate() {
            self.run_counted(sql).map_err(|err| match err {
                AgentError::Execution(message) => {
                    AgentError::Execution(format!("statement {index} failed: {message}"))
                }
                other => other,
            })?;
            executed += 1;
        }
        encode(&WorkloadResponse {
            executed,
        })
    }

    /// Executes `sql` and increments the counter when it succeeds.
    fn run_counted(&self, sql: &str) -> Result<(), AgentError> {
        self.executor.execute(sql).map_err(|err| AgentError::Execution(err.to_string()))?;
        self.counter.record_success().map_err(|err| AgentError::Counter(err.to_string()))
    }
}

impl CommandHandler for InstanceAgent {
    fn handle(&mut self, request: ControlMessage) -> ControlMessage {
        let command = request.command().to_string();
        let result = AgentRequest::decode(&request).and_then(|decoded| self.dispatch(decoded));
        match result {
            Ok(body) => ControlMessage::success(command, body),
            Err(err) => ControlMessage::failure(command, err.status(), err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a request body.
fn decode_body<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, AgentError> {
    T::deserialize(body).map_err(|err| AgentError::InvalidParams(err.to_string()))
}

/// Encodes a response body.
fn encode<T: Serialize>(body: &T) -> Result<Value, AgentError> {
    serde_json::to_value(body).map_err(|_| AgentError::Serialization)
}
