// crates/cockpit-cli/src/runtime.rs
// ============================================================================
// Module: Service Runtimes
// Description: Builds and starts the Instance Agent and backend services.
// Purpose: Turn validated configuration into running control servers.
// Dependencies: cockpit-agent, cockpit-channel, cockpit-config, cockpit-fleet
// ============================================================================

//! ## Overview
//! [`AgentRuntime`] serves one database and flushes its throughput counter
//! every epoch. [`BackendRuntime`] serves the Fleet Manager and the Workload
//! Generator, with the generator feeding tasks straight into the manager.
//! Both stop their threads on [`shutdown`](AgentRuntime::shutdown).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cockpit_agent::FlushScheduler;
use cockpit_agent::InstanceAgent;
use cockpit_agent::StorageSnapshotCell;
use cockpit_channel::ControlServer;
use cockpit_channel::ServerHandle;
use cockpit_channel::ServerSettings;
use cockpit_config::AgentConfig;
use cockpit_config::AgentDatabaseConfig;
use cockpit_config::AuditConfig;
use cockpit_config::BackendConfig;
use cockpit_config::ConfigError;
use cockpit_config::CounterConfig;
use cockpit_config::DriverConfig;
use cockpit_contract::ChannelKind;
use cockpit_core::AtomicCounterStore;
use cockpit_core::AuditSink;
use cockpit_core::ConnectionDescriptor;
use cockpit_core::CounterStore;
use cockpit_core::DatabaseDriver;
use cockpit_core::DatabaseId;
use cockpit_core::FileAuditSink;
use cockpit_core::NoopAuditSink;
use cockpit_core::QueryExecutor;
use cockpit_core::StderrAuditSink;
use cockpit_core::ThroughputCounter;
use cockpit_fleet::FleetManager;
use cockpit_fleet::FleetService;
use cockpit_fleet::FleetSettings;
use cockpit_fleet::GeneratorService;
use cockpit_fleet::PostgresDriver;
use cockpit_fleet::WorkloadGenerator;
use cockpit_fleet::WorkloadSink;
use cockpit_store_sqlite::SqliteCounterStore;
use cockpit_store_sqlite::SqliteDriver;
use cockpit_store_sqlite::SqliteExecutor;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Connections opened by an agent bound to a `SQLite` file.
const SQLITE_AGENT_CONNECTIONS: u32 = 4;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while starting a runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration value was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Database or counter store could not be opened.
    #[error("store error: {0}")]
    Store(String),
    /// Socket or thread could not be created.
    #[error("io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Shared Builders
// ============================================================================

/// Builds the audit sink described by `config`.
///
/// # Errors
///
/// Returns [`RuntimeError::Io`] when the audit file cannot be opened.
pub fn audit_sink(config: &AuditConfig) -> Result<Arc<dyn AuditSink>, RuntimeError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| RuntimeError::Io(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Builds the throughput counter store described by `config`.
///
/// # Errors
///
/// Returns [`RuntimeError::Store`] when the `SQLite` file cannot be opened.
pub fn counter_store(config: &CounterConfig) -> Result<Arc<dyn CounterStore>, RuntimeError> {
    match config {
        CounterConfig::Memory => Ok(Arc::new(AtomicCounterStore::new())),
        CounterConfig::Sqlite {
            path,
        } => {
            let store = SqliteCounterStore::open(Path::new(path))
                .map_err(|err| RuntimeError::Store(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Opens the statement executor of the agent's bound database.
fn agent_executor(config: &AgentDatabaseConfig) -> Result<Arc<dyn QueryExecutor>, RuntimeError> {
    match config {
        AgentDatabaseConfig::Postgres {
            host,
            port,
            user,
            password,
            dbname,
            max_connections,
        } => {
            let descriptor = ConnectionDescriptor {
                host: host.clone(),
                port: *port,
                user: user.clone(),
                password: password.clone(),
                dbname: dbname.clone(),
            };
            let driver = PostgresDriver::default();
            driver
                .validate_connection(&descriptor)
                .map_err(|err| RuntimeError::Store(err.to_string()))?;
            driver
                .open_pool(&descriptor, *max_connections)
                .map_err(|err| RuntimeError::Store(err.to_string()))
        }
        AgentDatabaseConfig::Sqlite {
            path,
        } => {
            let executor = SqliteExecutor::open(Path::new(path), SQLITE_AGENT_CONNECTIONS)
                .map_err(|err| RuntimeError::Store(err.to_string()))?;
            Ok(Arc::new(executor))
        }
    }
}

/// Builds the driver the Fleet Manager opens instance pools with.
fn fleet_driver(config: &DriverConfig) -> Arc<dyn DatabaseDriver> {
    match config {
        DriverConfig::Postgres {
            connect_timeout_ms,
        } => Arc::new(PostgresDriver::new(Duration::from_millis(*connect_timeout_ms))),
        DriverConfig::Sqlite {
            root,
        } => Arc::new(SqliteDriver::new(root)),
    }
}

// ============================================================================
// SECTION: Instance Agent
// ============================================================================

/// Running Instance Agent: control server plus flush thread.
pub struct AgentRuntime {
    /// Agent control server.
    server: ServerHandle,
    /// Per-epoch counter flush.
    scheduler: FlushScheduler,
    /// Counter shared with the agent.
    counter: Arc<ThroughputCounter>,
}

impl AgentRuntime {
    /// Opens the bound database and starts serving agent commands.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the database, counter store, or socket
    /// cannot be opened.
    pub fn start(
        config: &AgentConfig,
        max_body_bytes: usize,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, RuntimeError> {
        let addr = config.bind_addr()?;
        let epoch = config.epoch()?;
        let executor = agent_executor(&config.database)?;
        let counters = counter_store(&config.counter)?;
        let counter =
            Arc::new(ThroughputCounter::new(DatabaseId::new(config.database_id.clone()), counters));
        let scheduler = FlushScheduler::spawn(Arc::clone(&counter), epoch, Arc::clone(&audit))
            .map_err(|err| RuntimeError::Io(format!("flush thread: {err}")))?;
        let agent = InstanceAgent::new(executor, Arc::clone(&counter), StorageSnapshotCell::new());
        let settings = ServerSettings::new(ChannelKind::InstanceAgent.as_str())
            .with_max_body_bytes(max_body_bytes);
        let server = match ControlServer::bind_with_audit(addr, settings, agent, audit) {
            Ok(server) => server,
            Err(err) => {
                scheduler.stop();
                return Err(RuntimeError::Io(format!("bind {addr}: {err}")));
            }
        };
        Ok(Self {
            server,
            scheduler,
            counter,
        })
    }

    /// Returns the bound control address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Returns the agent's throughput counter.
    #[must_use]
    pub const fn counter(&self) -> &Arc<ThroughputCounter> {
        &self.counter
    }

    /// Stops the control server, then the flush thread.
    pub fn shutdown(self) {
        self.server.shutdown();
        self.scheduler.stop();
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Running backend: Fleet Manager and Workload Generator servers.
pub struct BackendRuntime {
    /// Fleet Manager control server.
    fleet_server: ServerHandle,
    /// Workload Generator control server.
    generator_server: ServerHandle,
    /// Shared fleet registry.
    manager: Arc<FleetManager>,
    /// Shared workload producer.
    generator: Arc<WorkloadGenerator>,
}

impl BackendRuntime {
    /// Starts both backend services.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the counter store or a socket cannot be
    /// opened.
    pub fn start(
        config: &BackendConfig,
        max_body_bytes: usize,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, RuntimeError> {
        let fleet_addr = config.fleet_addr()?;
        let generator_addr = config.generator_addr()?;
        let counters = counter_store(&config.counter)?;
        let manager = Arc::new(
            FleetManager::new(
                fleet_driver(&config.driver),
                counters,
                FleetSettings::new(&config.data_root),
            )
            .with_audit(Arc::clone(&audit)),
        );
        let sink: Arc<dyn WorkloadSink> = Arc::<FleetManager>::clone(&manager);
        let generator = Arc::new(WorkloadGenerator::new(&config.workloads_root, sink));

        let fleet_server = ControlServer::bind_with_audit(
            fleet_addr,
            ServerSettings::new(ChannelKind::FleetManager.as_str())
                .with_max_body_bytes(max_body_bytes),
            FleetService::new(Arc::clone(&manager)),
            Arc::clone(&audit),
        )
        .map_err(|err| RuntimeError::Io(format!("bind {fleet_addr}: {err}")))?;
        let generator_server = match ControlServer::bind_with_audit(
            generator_addr,
            ServerSettings::new(ChannelKind::WorkloadGenerator.as_str())
                .with_max_body_bytes(max_body_bytes),
            GeneratorService::new(Arc::clone(&generator)),
            audit,
        ) {
            Ok(server) => server,
            Err(err) => {
                fleet_server.shutdown();
                return Err(RuntimeError::Io(format!("bind {generator_addr}: {err}")));
            }
        };
        Ok(Self {
            fleet_server,
            generator_server,
            manager,
            generator,
        })
    }

    /// Returns the bound Fleet Manager address.
    #[must_use]
    pub fn fleet_addr(&self) -> SocketAddr {
        self.fleet_server.local_addr()
    }

    /// Returns the bound Workload Generator address.
    #[must_use]
    pub fn generator_addr(&self) -> SocketAddr {
        self.generator_server.local_addr()
    }

    /// Returns the fleet registry.
    #[must_use]
    pub const fn manager(&self) -> &Arc<FleetManager> {
        &self.manager
    }

    /// Stops task production, closes worker pools, then both servers.
    pub fn shutdown(self) {
        self.generator.stop();
        let _ = self.manager.close_workers();
        self.generator_server.shutdown();
        self.fleet_server.shutdown();
    }
}
