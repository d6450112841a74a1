// crates/cockpit-core/src/core/instance.rs
// ============================================================================
// Module: Cockpit Database Instances
// Description: Database instance descriptors, worker pool status, and plugins.
// Purpose: Describe fleet members as they travel over the Fleet Manager channel.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`DatabaseInstance`] is admitted to the fleet only after its connection
//! validated and its pool was created. Passwords never appear in `Debug`
//! output or in instance listings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DatabaseId;
use crate::core::identifiers::PluginName;

// ============================================================================
// SECTION: Connection Descriptor
// ============================================================================

/// Connection parameters for one database instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub dbname: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

// ============================================================================
// SECTION: Worker Pool Status
// ============================================================================

/// Lifecycle status of an instance's worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPoolStatus {
    /// Workers are consuming the task queue.
    Running,
    /// Workers are idle; no tasks are accepted.
    #[default]
    Stopped,
    /// The instance is busy with a data operation and rejects control changes.
    Blocked,
}

impl WorkerPoolStatus {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for WorkerPoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Database Instance
// ============================================================================

/// Registered fleet member.
///
/// # Invariants
/// - `id` is unique across the fleet.
/// - `number_workers` bounds the connection pool (`0..=number_workers`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    /// Fleet-unique identifier.
    pub id: DatabaseId,
    /// Connection parameters.
    pub connection: ConnectionDescriptor,
    /// Desired worker pool size.
    pub number_workers: u32,
    /// Current worker pool status.
    pub status: WorkerPoolStatus,
}

/// Table loaded into an instance from a benchmark data folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadedTable {
    /// Table name.
    pub table_name: String,
    /// Benchmark the table belongs to.
    pub benchmark: String,
}

/// Status report for one instance, returned by the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    /// Instance identifier.
    pub id: DatabaseId,
    /// True while a data operation holds the instance.
    pub database_blocked_status: bool,
    /// Worker pool status label.
    pub worker_pool_status: WorkerPoolStatus,
    /// Benchmarks whose tables are fully loaded.
    pub loaded_benchmarks: Vec<String>,
    /// Individually loaded tables.
    pub loaded_tables: Vec<LoadedTable>,
    /// Failure of the most recent data load, cleared by the next success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_load_error: Option<String>,
}

// ============================================================================
// SECTION: Plugins
// ============================================================================

/// Plugin activation state of one plugin on one database.
///
/// # Invariants
/// - Activation on one database never affects another database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginActivation {
    /// Database the plugin is attached to.
    pub database_id: DatabaseId,
    /// Plugin name.
    pub plugin_name: PluginName,
    /// Whether the plugin is active.
    pub active: bool,
    /// Current setting values keyed by setting name.
    pub settings: BTreeMap<String, String>,
}

impl PluginActivation {
    /// Creates an inactive activation record with the given default settings.
    #[must_use]
    pub const fn inactive(
        database_id: DatabaseId,
        plugin_name: PluginName,
        settings: BTreeMap<String, String>,
    ) -> Self {
        Self {
            database_id,
            plugin_name,
            active: false,
            settings,
        }
    }
}
