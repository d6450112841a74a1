// crates/cockpit-fleet/src/service.rs
// ============================================================================
// Module: Fleet Service
// Description: Control channel handler for Fleet Manager commands.
// Purpose: Decode requests, call the registry, and render typed replies.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! Each request decodes into a [`FleetRequest`] before dispatch; dispatch is
//! an exhaustive match with one arm per command and an explicit arm for
//! unrecognized names. Replies reuse the contract body types so the gateway's
//! schema validation sees exactly the shapes it expects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use cockpit_channel::CommandHandler;
use cockpit_contract::FleetCommand;
use cockpit_contract::bodies::AddDatabaseRequest;
use cockpit_contract::bodies::DataRequest;
use cockpit_contract::bodies::DatabaseRef;
use cockpit_contract::bodies::DatabasesResponse;
use cockpit_contract::bodies::PluginRequest;
use cockpit_contract::bodies::PluginSettingRequest;
use cockpit_contract::bodies::PluginSettingsResponse;
use cockpit_contract::bodies::PluginsResponse;
use cockpit_contract::bodies::QueueLengthResponse;
use cockpit_contract::bodies::StatusResponse;
use cockpit_core::ControlMessage;
use cockpit_core::empty_body;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::FleetError;
use crate::manager::FleetManager;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Decoded Fleet Manager request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetRequest {
    /// List databases.
    GetDatabases,
    /// Register a database.
    AddDatabase(AddDatabaseRequest),
    /// Remove a database.
    DeleteDatabase(DatabaseRef),
    /// Start every worker pool.
    StartWorker,
    /// Close every worker pool.
    CloseWorker,
    /// Report pending tasks.
    QueueLength,
    /// Report instance status.
    Status,
    /// List active plugins.
    GetPlugins,
    /// Activate a plugin.
    ActivatePlugin(PluginRequest),
    /// Deactivate a plugin.
    DeactivatePlugin(PluginRequest),
    /// List plugin settings.
    GetPluginSetting,
    /// Change a plugin setting.
    SetPluginSetting(PluginSettingRequest),
    /// Load a benchmark data folder.
    LoadData(DataRequest),
    /// Drop a benchmark data folder.
    DeleteData(DataRequest),
    /// Anything outside the catalog.
    Unrecognized(String),
}

impl FleetRequest {
    /// Decodes a control message into a typed request.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::InvalidParams`] when a known command carries a
    /// body of the wrong shape.
    pub fn decode(message: &ControlMessage) -> Result<Self, FleetError> {
        let Some(command) = FleetCommand::parse(message.command()) else {
            return Ok(Self::Unrecognized(message.command().to_string()));
        };
        let body = &message.body;
        Ok(match command {
            FleetCommand::GetDatabases => Self::GetDatabases,
            FleetCommand::AddDatabase => Self::AddDatabase(decode_body(body)?),
            FleetCommand::DeleteDatabase => Self::DeleteDatabase(decode_body(body)?),
            FleetCommand::StartWorker => Self::StartWorker,
            FleetCommand::CloseWorker => Self::CloseWorker,
            FleetCommand::QueueLength => Self::QueueLength,
            FleetCommand::Status => Self::Status,
            FleetCommand::GetPlugins => Self::GetPlugins,
            FleetCommand::ActivatePlugin => Self::ActivatePlugin(decode_body(body)?),
            FleetCommand::DeactivatePlugin => Self::DeactivatePlugin(decode_body(body)?),
            FleetCommand::GetPluginSetting => Self::GetPluginSetting,
            FleetCommand::SetPluginSetting => Self::SetPluginSetting(decode_body(body)?),
            FleetCommand::LoadData => Self::LoadData(decode_body(body)?),
            FleetCommand::DeleteData => Self::DeleteData(decode_body(body)?),
        })
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Control channel handler for the Fleet Manager.
pub struct FleetService {
    /// Shared registry.
    manager: Arc<FleetManager>,
}

impl FleetService {
    /// Wraps a registry.
    #[must_use]
    pub const fn new(manager: Arc<FleetManager>) -> Self {
        Self {
            manager,
        }
    }

    /// Handles a decoded request.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the command fails.
    pub fn dispatch(&self, request: FleetRequest) -> Result<Value, FleetError> {
        let manager = self.manager.as_ref();
        match request {
            FleetRequest::GetDatabases => encode(&DatabasesResponse {
                databases: manager.databases()?,
            }),
            FleetRequest::AddDatabase(body) => manager.add_database(&body).map(|()| empty_body()),
            FleetRequest::DeleteDatabase(body) => {
                manager.delete_database(&body.id).map(|()| empty_body())
            }
            FleetRequest::StartWorker => manager.start_workers().map(|()| empty_body()),
            FleetRequest::CloseWorker => manager.close_workers().map(|()| empty_body()),
            FleetRequest::QueueLength => encode(&QueueLengthResponse {
                queue_length: manager.queue_lengths()?,
            }),
            FleetRequest::Status => encode(&StatusResponse {
                status: manager.status()?,
            }),
            FleetRequest::GetPlugins => encode(&PluginsResponse {
                plugins: manager.plugins()?,
            }),
            FleetRequest::ActivatePlugin(body) => {
                manager.activate_plugin(&body.id, &body.plugin).map(|()| empty_body())
            }
            FleetRequest::DeactivatePlugin(body) => {
                manager.deactivate_plugin(&body.id, &body.plugin).map(|()| empty_body())
            }
            FleetRequest::GetPluginSetting => encode(&PluginSettingsResponse {
                plugin_settings: manager.plugin_settings()?,
            }),
            FleetRequest::SetPluginSetting(body) => {
                manager.set_plugin_setting(&body.id, &body.name, &body.value).map(|()| empty_body())
            }
            FleetRequest::LoadData(body) => {
                manager.load_data(&body.folder_name).map(|()| empty_body())
            }
            FleetRequest::DeleteData(body) => {
                manager.delete_data(&body.folder_name).map(|()| empty_body())
            }
            FleetRequest::Unrecognized(name) => Err(FleetError::UnknownCommand(name)),
        }
    }
}

impl CommandHandler for FleetService {
    fn handle(&mut self, request: ControlMessage) -> ControlMessage {
        let command = request.command().to_string();
        let result = FleetRequest::decode(&request).and_then(|decoded| self.dispatch(decoded));
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
fn decode_body<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, FleetError> {
    T::deserialize(body).map_err(|err| FleetError::InvalidParams(err.to_string()))
}

/// Encodes a response body.
fn encode<T: Serialize>(body: &T) -> Result<Value, FleetError> {
    serde_json::to_value(body).map_err(|err| FleetError::Internal(err.to_string()))
}
