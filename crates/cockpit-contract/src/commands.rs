// crates/cockpit-contract/src/commands.rs
// ============================================================================
// Module: Command Catalog
// Description: Command enums for every control channel with stable wire names.
// Purpose: Replace string-keyed dispatch with exhaustive command variants.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each channel accepts a closed set of commands. Wire names are the strings
//! carried in `header.message`; [`FleetCommand::parse`] and friends return
//! `None` for anything else so servers can answer "unrecognized command".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Channels
// ============================================================================

/// Logical control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Gateway to Fleet Manager.
    FleetManager,
    /// Gateway to Workload Generator.
    WorkloadGenerator,
    /// Gateway to one Instance Agent.
    InstanceAgent,
}

impl ChannelKind {
    /// Returns the stable channel label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FleetManager => "fleet_manager",
            Self::WorkloadGenerator => "workload_generator",
            Self::InstanceAgent => "instance_agent",
        }
    }

    /// Returns the wire names of every command accepted on the channel.
    #[must_use]
    pub fn command_names(self) -> Vec<&'static str> {
        match self {
            Self::FleetManager => FleetCommand::ALL.iter().map(|c| c.wire_name()).collect(),
            Self::WorkloadGenerator => {
                GeneratorCommand::ALL.iter().map(|c| c.wire_name()).collect()
            }
            Self::InstanceAgent => AgentCommand::ALL.iter().map(|c| c.wire_name()).collect(),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Fleet Manager
// ============================================================================

/// Commands accepted by the Fleet Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FleetCommand {
    /// List registered databases.
    GetDatabases,
    /// Validate and register a database.
    AddDatabase,
    /// Remove a database and its pool.
    DeleteDatabase,
    /// Start every worker pool.
    StartWorker,
    /// Close every worker pool.
    CloseWorker,
    /// Report pending tasks per database.
    QueueLength,
    /// Report per-database status.
    Status,
    /// Report active plugins per database.
    GetPlugins,
    /// Activate a plugin on one database.
    ActivatePlugin,
    /// Deactivate a plugin on one database.
    DeactivatePlugin,
    /// Report plugin settings per database.
    GetPluginSetting,
    /// Change one plugin setting on one database.
    SetPluginSetting,
    /// Load a benchmark data folder into every database.
    LoadData,
    /// Drop a benchmark's tables from every database.
    DeleteData,
}

impl FleetCommand {
    /// Every Fleet Manager command.
    pub const ALL: [Self; 14] = [
        Self::GetDatabases,
        Self::AddDatabase,
        Self::DeleteDatabase,
        Self::StartWorker,
        Self::CloseWorker,
        Self::QueueLength,
        Self::Status,
        Self::GetPlugins,
        Self::ActivatePlugin,
        Self::DeactivatePlugin,
        Self::GetPluginSetting,
        Self::SetPluginSetting,
        Self::LoadData,
        Self::DeleteData,
    ];

    /// Returns the wire name carried in `header.message`.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::GetDatabases => "get databases",
            Self::AddDatabase => "add database",
            Self::DeleteDatabase => "delete database",
            Self::StartWorker => "start worker",
            Self::CloseWorker => "close worker",
            Self::QueueLength => "queue length",
            Self::Status => "status",
            Self::GetPlugins => "get plugins",
            Self::ActivatePlugin => "activate plugin",
            Self::DeactivatePlugin => "deactivate plugin",
            Self::GetPluginSetting => "get plugin setting",
            Self::SetPluginSetting => "set plugin setting",
            Self::LoadData => "load data",
            Self::DeleteData => "delete data",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.wire_name() == name)
    }
}

// ============================================================================
// SECTION: Workload Generator
// ============================================================================

/// Commands accepted by the Workload Generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorCommand {
    /// Start producing queries from a workload folder.
    StartWorkload,
    /// Stop producing queries.
    StopWorkload,
}

impl GeneratorCommand {
    /// Every Workload Generator command.
    pub const ALL: [Self; 2] = [Self::StartWorkload, Self::StopWorkload];

    /// Returns the wire name carried in `header.message`.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::StartWorkload => "start workload",
            Self::StopWorkload => "stop workload",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.wire_name() == name)
    }
}

// ============================================================================
// SECTION: Instance Agent
// ============================================================================

/// Commands accepted by an Instance Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentCommand {
    /// Execute one statement.
    Query,
    /// Execute a list of statements in order.
    Workload,
    /// Return the last storage snapshot.
    StorageData,
    /// Return the last completed epoch's throughput.
    Throughput,
    /// Reserved; answered with "not implemented".
    RuntimeInformation,
}

impl AgentCommand {
    /// Every Instance Agent command.
    pub const ALL: [Self; 5] = [
        Self::Query,
        Self::Workload,
        Self::StorageData,
        Self::Throughput,
        Self::RuntimeInformation,
    ];

    /// Returns the wire name carried in `header.message`.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Workload => "workload",
            Self::StorageData => "storage_data",
            Self::Throughput => "throughput",
            Self::RuntimeInformation => "runtime_information",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.wire_name() == name)
    }
}
