// crates/cockpit-gateway/src/clients.rs
// ============================================================================
// Module: Typed Channel Clients
// Description: Typed wrappers for Fleet Manager, Workload Generator, and agent commands.
// Purpose: Turn control replies into typed values or classified errors.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! Clients send one request per call through a [`CommandChannel`]. Three
//! outcomes are kept apart: a channel failure (transport or protocol
//! violation), a command failure reported through `header.status`, and a
//! success whose body is decoded into the contract type. A command failure
//! without `body.error` carries a generic fallback message naming the
//! command and status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use cockpit_channel::ChannelError;
use cockpit_channel::CommandChannel;
use cockpit_contract::AgentCommand;
use cockpit_contract::FleetCommand;
use cockpit_contract::GeneratorCommand;
use cockpit_contract::bodies::ActivePluginsEntry;
use cockpit_contract::bodies::AddDatabaseRequest;
use cockpit_contract::bodies::DataRequest;
use cockpit_contract::bodies::DatabaseRef;
use cockpit_contract::bodies::DatabaseSummary;
use cockpit_contract::bodies::DatabasesResponse;
use cockpit_contract::bodies::PluginRequest;
use cockpit_contract::bodies::PluginSettingRequest;
use cockpit_contract::bodies::PluginSettingsEntry;
use cockpit_contract::bodies::PluginSettingsResponse;
use cockpit_contract::bodies::PluginsResponse;
use cockpit_contract::bodies::QueryRequest;
use cockpit_contract::bodies::QueueLengthEntry;
use cockpit_contract::bodies::QueueLengthResponse;
use cockpit_contract::bodies::StartWorkloadRequest;
use cockpit_contract::bodies::StatusResponse;
use cockpit_contract::bodies::StorageResponse;
use cockpit_contract::bodies::ThroughputResponse;
use cockpit_contract::bodies::WorkloadRequest;
use cockpit_contract::bodies::WorkloadResponse;
use cockpit_core::ControlMessage;
use cockpit_core::DatabaseId;
use cockpit_core::InstanceStatus;
use cockpit_core::StatusCode;
use cockpit_core::empty_body;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client call errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or protocol violation.
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// The remote command reported a non-success status.
    #[error("{message}")]
    Command {
        /// Issued command.
        command: String,
        /// Reported status code.
        status: StatusCode,
        /// Remote error message, or the generic fallback.
        message: String,
    },
    /// The request body could not be encoded.
    #[error("request encoding failed: {0}")]
    Encoding(String),
}

impl ClientError {
    /// Returns the status a gateway surface reports for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Command {
                status, ..
            } => *status,
            Self::Channel(_) | Self::Encoding(_) => StatusCode::SERVER_ERROR,
        }
    }
}

/// Returns the generic message used when a failed reply carries no error text.
#[must_use]
pub fn fallback_message(command: &str, status: StatusCode) -> String {
    format!("command `{command}` failed with status {}", status.as_u16())
}

// ============================================================================
// SECTION: Call Helpers
// ============================================================================

/// Sends one command and returns the success body.
///
/// # Errors
///
/// Returns [`ClientError`] on channel failure or non-success status.
pub fn call(
    channel: &dyn CommandChannel,
    command: &str,
    body: Value,
) -> Result<Value, ClientError> {
    let reply = channel.send(&ControlMessage::request(command, body))?;
    if reply.is_success() {
        return Ok(reply.body);
    }
    let status = reply.status().unwrap_or(StatusCode::SERVER_ERROR);
    let message = reply
        .error_message()
        .map_or_else(|| fallback_message(command, status), ToString::to_string);
    Err(ClientError::Command {
        command: command.to_string(),
        status,
        message,
    })
}

/// Sends one command with a typed request body and decodes a typed reply.
fn call_typed<Req: Serialize, Resp: DeserializeOwned>(
    channel: &dyn CommandChannel,
    command: &str,
    request: &Req,
) -> Result<Resp, ClientError> {
    let body = serde_json::to_value(request).map_err(|err| ClientError::Encoding(err.to_string()))?;
    decode(command, call(channel, command, body)?)
}

/// Sends one command without a body and decodes a typed reply.
fn call_bare<Resp: DeserializeOwned>(
    channel: &dyn CommandChannel,
    command: &str,
) -> Result<Resp, ClientError> {
    decode(command, call(channel, command, empty_body())?)
}

/// Sends one command with a typed body and discards the reply body.
fn call_unit<Req: Serialize>(
    channel: &dyn CommandChannel,
    command: &str,
    request: &Req,
) -> Result<(), ClientError> {
    let body = serde_json::to_value(request).map_err(|err| ClientError::Encoding(err.to_string()))?;
    call(channel, command, body).map(|_| ())
}

/// Decodes a validated success body.
fn decode<T: DeserializeOwned>(command: &str, body: Value) -> Result<T, ClientError> {
    serde_json::from_value(body).map_err(|err| {
        ClientError::Channel(ChannelError::ProtocolViolation(format!("`{command}` reply: {err}")))
    })
}

// ============================================================================
// SECTION: Fleet Manager
// ============================================================================

/// Typed Fleet Manager client.
#[derive(Clone)]
pub struct FleetClient {
    /// Fleet Manager channel.
    channel: Arc<dyn CommandChannel>,
}

impl FleetClient {
    /// Wraps a Fleet Manager channel.
    #[must_use]
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self {
            channel,
        }
    }

    /// Returns the underlying channel.
    #[must_use]
    pub fn channel(&self) -> &Arc<dyn CommandChannel> {
        &self.channel
    }

    /// Lists registered databases.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn databases(&self) -> Result<Vec<DatabaseSummary>, ClientError> {
        let response: DatabasesResponse =
            call_bare(self.channel.as_ref(), FleetCommand::GetDatabases.wire_name())?;
        Ok(response.databases)
    }

    /// Registers a database.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn add_database(&self, request: &AddDatabaseRequest) -> Result<(), ClientError> {
        call_unit(self.channel.as_ref(), FleetCommand::AddDatabase.wire_name(), request)
    }

    /// Removes a database.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn delete_database(&self, id: &DatabaseId) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            FleetCommand::DeleteDatabase.wire_name(),
            &DatabaseRef {
                id: id.clone(),
            },
        )
    }

    /// Starts every worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn start_worker(&self) -> Result<(), ClientError> {
        call(self.channel.as_ref(), FleetCommand::StartWorker.wire_name(), empty_body()).map(|_| ())
    }

    /// Closes every worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn close_worker(&self) -> Result<(), ClientError> {
        call(self.channel.as_ref(), FleetCommand::CloseWorker.wire_name(), empty_body()).map(|_| ())
    }

    /// Returns pending task counts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn queue_length(&self) -> Result<Vec<QueueLengthEntry>, ClientError> {
        let response: QueueLengthResponse =
            call_bare(self.channel.as_ref(), FleetCommand::QueueLength.wire_name())?;
        Ok(response.queue_length)
    }

    /// Returns instance status reports.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn status(&self) -> Result<Vec<InstanceStatus>, ClientError> {
        let response: StatusResponse =
            call_bare(self.channel.as_ref(), FleetCommand::Status.wire_name())?;
        Ok(response.status)
    }

    /// Returns active plugins.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn plugins(&self) -> Result<Vec<ActivePluginsEntry>, ClientError> {
        let response: PluginsResponse =
            call_bare(self.channel.as_ref(), FleetCommand::GetPlugins.wire_name())?;
        Ok(response.plugins)
    }

    /// Activates a plugin on one database.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn activate_plugin(&self, id: &DatabaseId, plugin: &str) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            FleetCommand::ActivatePlugin.wire_name(),
            &plugin_request(id, plugin),
        )
    }

    /// Deactivates a plugin on one database.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn deactivate_plugin(&self, id: &DatabaseId, plugin: &str) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            FleetCommand::DeactivatePlugin.wire_name(),
            &plugin_request(id, plugin),
        )
    }

    /// Returns the settings of active plugins.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn plugin_settings(&self) -> Result<Vec<PluginSettingsEntry>, ClientError> {
        let response: PluginSettingsResponse =
            call_bare(self.channel.as_ref(), FleetCommand::GetPluginSetting.wire_name())?;
        Ok(response.plugin_settings)
    }

    /// Changes a plugin setting.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn set_plugin_setting(
        &self,
        id: &DatabaseId,
        name: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            FleetCommand::SetPluginSetting.wire_name(),
            &PluginSettingRequest {
                id: id.clone(),
                name: name.to_string(),
                value: value.to_string(),
            },
        )
    }

    /// Starts loading a benchmark data folder.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn load_data(&self, folder_name: &str) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            FleetCommand::LoadData.wire_name(),
            &data_request(folder_name),
        )
    }

    /// Drops a benchmark data folder.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn delete_data(&self, folder_name: &str) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            FleetCommand::DeleteData.wire_name(),
            &data_request(folder_name),
        )
    }
}

/// Builds a plugin request body.
fn plugin_request(id: &DatabaseId, plugin: &str) -> PluginRequest {
    PluginRequest {
        id: id.clone(),
        plugin: plugin.to_string(),
    }
}

/// Builds a data request body.
fn data_request(folder_name: &str) -> DataRequest {
    DataRequest {
        folder_name: folder_name.to_string(),
    }
}

// ============================================================================
// SECTION: Workload Generator
// ============================================================================

/// Typed Workload Generator client.
#[derive(Clone)]
pub struct GeneratorClient {
    /// Workload Generator channel.
    channel: Arc<dyn CommandChannel>,
}

impl GeneratorClient {
    /// Wraps a Workload Generator channel.
    #[must_use]
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self {
            channel,
        }
    }

    /// Starts generating `folder_name` at `frequency` queries per second.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn start_workload(&self, folder_name: &str, frequency: u32) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            GeneratorCommand::StartWorkload.wire_name(),
            &StartWorkloadRequest {
                folder_name: folder_name.to_string(),
                frequency,
            },
        )
    }

    /// Stops generation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn stop_workload(&self) -> Result<(), ClientError> {
        call(self.channel.as_ref(), GeneratorCommand::StopWorkload.wire_name(), empty_body())
            .map(|_| ())
    }
}

// ============================================================================
// SECTION: Instance Agent
// ============================================================================

/// Typed Instance Agent client.
#[derive(Clone)]
pub struct AgentClient {
    /// Agent channel.
    channel: Arc<dyn CommandChannel>,
}

impl AgentClient {
    /// Wraps an agent channel.
    #[must_use]
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self {
            channel,
        }
    }

    /// Runs one statement.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn query(&self, sql: &str) -> Result<(), ClientError> {
        call_unit(
            self.channel.as_ref(),
            AgentCommand::Query.wire_name(),
            &QueryRequest {
                query: sql.to_string(),
            },
        )
    }

    /// Runs statements in order; returns how many executed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn workload(&self, queries: Vec<String>) -> Result<u64, ClientError> {
        let response: WorkloadResponse = call_typed(
            self.channel.as_ref(),
            AgentCommand::Workload.wire_name(),
            &WorkloadRequest {
                queries,
            },
        )?;
        Ok(response.executed)
    }

    /// Returns the latest storage snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn storage_data(&self) -> Result<Map<String, Value>, ClientError> {
        let response: StorageResponse =
            call_bare(self.channel.as_ref(), AgentCommand::StorageData.wire_name())?;
        Ok(response.storage)
    }

    /// Returns the throughput of the last completed epoch.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    pub fn throughput(&self) -> Result<u64, ClientError> {
        let response: ThroughputResponse =
            call_bare(self.channel.as_ref(), AgentCommand::Throughput.wire_name())?;
        Ok(response.throughput)
    }
}
