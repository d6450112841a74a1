// crates/cockpit-contract/src/bodies.rs
// ============================================================================
// Module: Wire Bodies
// Description: Typed request and response bodies for every control command.
// Purpose: Share one serde definition of each payload between servers and clients.
// Dependencies: cockpit-core, serde
// ============================================================================

//! ## Overview
//! Request bodies are decoded by servers and encoded by clients. Response
//! bodies are encoded by servers and decoded by clients only after the raw
//! response passed schema validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use cockpit_core::ConnectionDescriptor;
use cockpit_core::DatabaseId;
use cockpit_core::DatabaseInstance;
use cockpit_core::InstanceStatus;
use cockpit_core::WorkerPoolStatus;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default workload frequency (queries per second) when a caller omits it.
pub const DEFAULT_WORKLOAD_FREQUENCY: u32 = 200;

// ============================================================================
// SECTION: Fleet Manager Requests
// ============================================================================

/// Body of `add database`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDatabaseRequest {
    /// Fleet-unique identifier.
    pub id: DatabaseId,
    /// Worker pool size.
    pub number_workers: u32,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Database name.
    pub dbname: String,
}

impl AddDatabaseRequest {
    /// Returns the connection descriptor carried by the request.
    #[must_use]
    pub fn connection(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            dbname: self.dbname.clone(),
        }
    }
}

/// Body of `delete database`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRef {
    /// Target database.
    pub id: DatabaseId,
}

/// Body of `activate plugin` and `deactivate plugin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequest {
    /// Target database.
    pub id: DatabaseId,
    /// Plugin name.
    pub plugin: String,
}

/// Body of `set plugin setting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettingRequest {
    /// Target database.
    pub id: DatabaseId,
    /// Setting name.
    pub name: String,
    /// New setting value.
    pub value: String,
}

/// Body of `load data` and `delete data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Benchmark data folder.
    pub folder_name: String,
}

// ============================================================================
// SECTION: Fleet Manager Responses
// ============================================================================

/// Listing entry of `get databases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    /// Instance identifier.
    pub id: DatabaseId,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Database name.
    pub dbname: String,
    /// Worker pool size.
    pub number_workers: u32,
    /// Worker pool status.
    pub worker_pool_status: WorkerPoolStatus,
}

impl From<&DatabaseInstance> for DatabaseSummary {
    fn from(instance: &DatabaseInstance) -> Self {
        Self {
            id: instance.id.clone(),
            host: instance.connection.host.clone(),
            port: instance.connection.port,
            dbname: instance.connection.dbname.clone(),
            number_workers: instance.number_workers,
            worker_pool_status: instance.status,
        }
    }
}

/// Success body of `get databases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabasesResponse {
    /// Registered databases.
    pub databases: Vec<DatabaseSummary>,
}

/// Entry of `queue length`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLengthEntry {
    /// Instance identifier.
    pub id: DatabaseId,
    /// Pending tasks.
    pub queue_length: u64,
}

/// Success body of `queue length`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLengthResponse {
    /// Per-database queue lengths.
    pub queue_length: Vec<QueueLengthEntry>,
}

/// Success body of `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Per-database status.
    pub status: Vec<InstanceStatus>,
}

/// Entry of `get plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePluginsEntry {
    /// Instance identifier.
    pub id: DatabaseId,
    /// Active plugin names.
    pub plugins: Vec<String>,
}

/// Success body of `get plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginsResponse {
    /// Per-database active plugins.
    pub plugins: Vec<ActivePluginsEntry>,
}

/// One plugin setting with its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSetting {
    /// Plugin owning the setting.
    pub plugin: String,
    /// Setting name.
    pub name: String,
    /// Current value.
    pub value: String,
    /// Human readable description.
    pub description: String,
}

/// Entry of `get plugin setting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettingsEntry {
    /// Instance identifier.
    pub id: DatabaseId,
    /// Settings of every active plugin.
    pub plugin_settings: Vec<PluginSetting>,
}

/// Success body of `get plugin setting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettingsResponse {
    /// Per-database plugin settings.
    pub plugin_settings: Vec<PluginSettingsEntry>,
}

// ============================================================================
// SECTION: Workload Generator
// ============================================================================

/// Body of `start workload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkloadRequest {
    /// Workload folder to replay.
    pub folder_name: String,
    /// Queries per second.
    #[serde(default = "default_frequency")]
    pub frequency: u32,
}

/// Returns the default workload frequency.
const fn default_frequency() -> u32 {
    DEFAULT_WORKLOAD_FREQUENCY
}

// ============================================================================
// SECTION: Instance Agent
// ============================================================================

/// Body of the agent `query` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Statement text.
    pub query: String,
}

/// Body of the agent `workload` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRequest {
    /// Statements executed in order.
    pub queries: Vec<String>,
}

/// Success body of the agent `workload` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadResponse {
    /// Number of statements executed.
    pub executed: u64,
}

/// Success body of the agent `throughput` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputResponse {
    /// Throughput of the last completed epoch.
    pub throughput: u64,
}

/// Success body of the agent `storage_data` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageResponse {
    /// Last storage snapshot; empty when none was collected yet.
    pub storage: Map<String, Value>,
}
