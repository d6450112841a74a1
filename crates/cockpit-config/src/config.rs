// crates/cockpit-config/src/config.rs
// ============================================================================
// Module: Cockpit Configuration
// Description: Configuration loading and validation for Cockpit processes.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: cockpit-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The `[gateway]` section is always present (with defaults); `[agent]` and
//! `[backend]` are only required by the processes that serve them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use cockpit_core::Epoch;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "cockpit.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "COCKPIT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum channel request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum channel request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;
/// Maximum reporting epoch in milliseconds.
pub(crate) const MAX_EPOCH_MS: u64 = 3_600_000;
/// Hard upper bound for channel frame bodies.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum worker pool size per database.
pub(crate) const MAX_WORKERS: u32 = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Cockpit configuration root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CockpitConfig {
    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Instance agent settings.
    #[serde(default)]
    pub agent: Option<AgentConfig>,
    /// Fleet Manager and Workload Generator settings.
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Transport limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl CockpitConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        if let Some(agent) = &self.agent {
            agent.validate()?;
        }
        if let Some(backend) = &self.backend {
            backend.validate()?;
        }
        self.audit.validate()?;
        self.limits.validate()?;
        Ok(())
    }

    /// Returns the agent section or an error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `[agent]` is missing.
    pub fn require_agent(&self) -> Result<&AgentConfig, ConfigError> {
        self.agent
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("[agent] section is required".to_string()))
    }

    /// Returns the backend section or an error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `[backend]` is missing.
    pub fn require_backend(&self) -> Result<&BackendConfig, ConfigError> {
        self.backend
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("[backend] section is required".to_string()))
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Fleet Manager endpoint (`host:port`).
    #[serde(default = "default_fleet_manager")]
    pub fleet_manager: String,
    /// Workload Generator endpoint (`host:port`).
    #[serde(default = "default_workload_generator")]
    pub workload_generator: String,
    /// Control channel request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Reporting epoch used for aggregation windows.
    #[serde(default = "default_epoch_ms")]
    pub epoch_ms: u64,
    /// Time-series store read settings.
    #[serde(default)]
    pub timeseries: TimeSeriesConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            fleet_manager: default_fleet_manager(),
            workload_generator: default_workload_generator(),
            request_timeout_ms: default_request_timeout_ms(),
            epoch_ms: default_epoch_ms(),
            timeseries: TimeSeriesConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the reporting epoch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the epoch is out of range.
    pub fn epoch(&self) -> Result<Epoch, ConfigError> {
        epoch_from_millis("gateway.epoch_ms", self.epoch_ms)
    }

    /// Validates gateway settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("gateway.fleet_manager", &self.fleet_manager)?;
        validate_endpoint("gateway.workload_generator", &self.workload_generator)?;
        validate_timeout("gateway.request_timeout_ms", self.request_timeout_ms)?;
        self.epoch()?;
        self.timeseries.validate()
    }
}

/// Time-series store read settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum TimeSeriesConfig {
    /// Process-local store (tests and single-process fleets).
    #[default]
    Memory,
    /// `InfluxDB` 1.x HTTP query API.
    Influx {
        /// Base URL, for example `http://localhost:8086`.
        url: String,
        /// Optional user name.
        #[serde(default)]
        user: Option<String>,
        /// Optional password.
        #[serde(default)]
        password: Option<String>,
        /// Request timeout.
        #[serde(default = "default_request_timeout_ms")]
        timeout_ms: u64,
    },
}

impl TimeSeriesConfig {
    /// Validates time-series settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Memory => Ok(()),
            Self::Influx {
                url,
                timeout_ms,
                ..
            } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid(
                        "gateway.timeseries.url must be an http(s) url".to_string(),
                    ));
                }
                validate_timeout("gateway.timeseries.timeout_ms", *timeout_ms)
            }
        }
    }
}

// ============================================================================
// SECTION: Agent
// ============================================================================

/// Instance agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Listen address of the agent control channel.
    pub bind: String,
    /// Database the agent is bound to.
    pub database_id: String,
    /// Counter flush period.
    #[serde(default = "default_epoch_ms")]
    pub epoch_ms: u64,
    /// Bound database.
    pub database: AgentDatabaseConfig,
    /// Throughput counter store.
    #[serde(default)]
    pub counter: CounterConfig,
}

impl AgentConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind("agent.bind", &self.bind)
    }

    /// Returns the counter flush period.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the epoch is out of range.
    pub fn epoch(&self) -> Result<Epoch, ConfigError> {
        epoch_from_millis("agent.epoch_ms", self.epoch_ms)
    }

    /// Validates agent settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.database_id.trim().is_empty() {
            return Err(ConfigError::Invalid("agent.database_id must be non-empty".to_string()));
        }
        self.epoch()?;
        self.database.validate()?;
        self.counter.validate("agent.counter")
    }
}

/// Database bound to an instance agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AgentDatabaseConfig {
    /// Postgres wire protocol database (Hyrise, Postgres).
    Postgres {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
        /// Login user.
        user: String,
        /// Login password.
        #[serde(default)]
        password: String,
        /// Database name.
        dbname: String,
        /// Maximum pooled connections.
        #[serde(default = "default_agent_connections")]
        max_connections: u32,
    },
    /// Local `SQLite` file.
    Sqlite {
        /// Database file path.
        path: String,
    },
}

impl AgentDatabaseConfig {
    /// Validates database settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Postgres {
                host,
                dbname,
                max_connections,
                ..
            } => {
                if host.trim().is_empty() || dbname.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "agent.database host and dbname must be non-empty".to_string(),
                    ));
                }
                validate_workers("agent.database.max_connections", *max_connections)
            }
            Self::Sqlite {
                path,
            } => validate_path_string("agent.database.path", path),
        }
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Fleet Manager and Workload Generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Listen address of the Fleet Manager channel.
    pub fleet_bind: String,
    /// Listen address of the Workload Generator channel.
    pub generator_bind: String,
    /// Root of benchmark data folders (`<root>/<folder>/<table>.sql`).
    pub data_root: String,
    /// Root of workload folders (`<root>/<folder>/<query>.sql`).
    pub workloads_root: String,
    /// Driver used to open instance pools.
    #[serde(default)]
    pub driver: DriverConfig,
    /// Throughput counter store shared with instance agents.
    #[serde(default)]
    pub counter: CounterConfig,
}

impl BackendConfig {
    /// Returns the parsed Fleet Manager bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn fleet_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind("backend.fleet_bind", &self.fleet_bind)
    }

    /// Returns the parsed Workload Generator bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn generator_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind("backend.generator_bind", &self.generator_bind)
    }

    /// Validates backend settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.fleet_addr()?;
        self.generator_addr()?;
        validate_path_string("backend.data_root", &self.data_root)?;
        validate_path_string("backend.workloads_root", &self.workloads_root)?;
        self.driver.validate()?;
        self.counter.validate("backend.counter")
    }
}

/// Driver used by the Fleet Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum DriverConfig {
    /// Postgres wire protocol (Hyrise, Postgres).
    Postgres {
        /// Connect timeout applied to validation and pooled connections.
        #[serde(default = "default_request_timeout_ms")]
        connect_timeout_ms: u64,
    },
    /// `SQLite` files named `<root>/<dbname>.sqlite3`.
    Sqlite {
        /// Directory holding database files.
        root: String,
    },
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::Postgres {
            connect_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl DriverConfig {
    /// Validates driver settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Postgres {
                connect_timeout_ms,
            } => validate_timeout("backend.driver.connect_timeout_ms", *connect_timeout_ms),
            Self::Sqlite {
                root,
            } => validate_path_string("backend.driver.root", root),
        }
    }
}

/// Throughput counter store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum CounterConfig {
    /// In-process atomics; only valid when workers run in the same process.
    #[default]
    Memory,
    /// Shared `SQLite` file visible to every process on the host.
    Sqlite {
        /// Counter database path.
        path: String,
    },
}

impl CounterConfig {
    /// Validates counter settings.
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Memory => Ok(()),
            Self::Sqlite {
                path,
            } => validate_path_string(&format!("{field}.path"), path),
        }
    }
}

// ============================================================================
// SECTION: Audit and Limits
// ============================================================================

/// Audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Whether audit events are emitted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON-lines file; stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Transport limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum control channel frame body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl LimitsConfig {
    /// Validates limit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "limits.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default Fleet Manager endpoint.
fn default_fleet_manager() -> String {
    "127.0.0.1:8001".to_string()
}

/// Default Workload Generator endpoint.
fn default_workload_generator() -> String {
    "127.0.0.1:8002".to_string()
}

/// Default request timeout.
const fn default_request_timeout_ms() -> u64 {
    5_000
}

/// Default reporting epoch.
const fn default_epoch_ms() -> u64 {
    1_000
}

/// Default agent connection pool size.
const fn default_agent_connections() -> u32 {
    4
}

/// Default maximum frame body size.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Returns true.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a `host:port` endpoint.
fn validate_endpoint(field: &str, value: &str) -> Result<(), ConfigError> {
    let Some((host, port)) = value.rsplit_once(':') else {
        return Err(ConfigError::Invalid(format!("{field} must be host:port")));
    };
    if host.trim().is_empty() || port.parse::<u16>().is_err() {
        return Err(ConfigError::Invalid(format!("{field} must be host:port")));
    }
    Ok(())
}

/// Parses a listen address.
fn parse_bind(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::Invalid(format!("{field} is not a valid address")))
}

/// Validates a timeout in milliseconds.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {MIN_REQUEST_TIMEOUT_MS} and {MAX_REQUEST_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

/// Validates a worker or connection count.
fn validate_workers(field: &str, value: u32) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_WORKERS {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {MAX_WORKERS}")));
    }
    Ok(())
}

/// Converts and bounds an epoch in milliseconds.
fn epoch_from_millis(field: &str, value: u64) -> Result<Epoch, ConfigError> {
    if value > MAX_EPOCH_MS {
        return Err(ConfigError::Invalid(format!("{field} must be at most {MAX_EPOCH_MS}")));
    }
    Epoch::from_millis(value)
        .ok_or_else(|| ConfigError::Invalid(format!("{field} must be greater than zero")))
}
