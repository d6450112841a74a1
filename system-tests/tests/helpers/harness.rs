// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Fleet Harness
// Description: Backend, one instance agent, and a journaled gateway over TCP.
// Purpose: Run scenarios against the real services on ephemeral ports.
// Dependencies: cockpit-cli, cockpit-agent, cockpit-gateway, tempfile
// ============================================================================

//! ## Overview
//! The backend runs exactly as `cockpit serve backend` would, over the
//! `SQLite` driver. The agent is served directly so the scenario owns its
//! throughput counter and can flush it on demand instead of waiting for an
//! epoch. Backend workers count into a shared `SQLite` counter file that
//! scenarios can peek. The gateway talks to both services through journaled
//! control channels.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use cockpit_agent::InstanceAgent;
use cockpit_agent::StorageSnapshotCell;
use cockpit_channel::ChannelSettings;
use cockpit_channel::CommandChannel;
use cockpit_channel::ControlChannel;
use cockpit_channel::ControlServer;
use cockpit_channel::ServerHandle;
use cockpit_channel::ServerSettings;
use cockpit_cli::BackendRuntime;
use cockpit_config::BackendConfig;
use cockpit_config::CounterConfig;
use cockpit_config::DriverConfig;
use cockpit_contract::ChannelKind;
use cockpit_contract::ResponseValidator;
use cockpit_contract::bodies::AddDatabaseRequest;
use cockpit_core::AtomicCounterStore;
use cockpit_core::AuditSink;
use cockpit_core::CounterStore;
use cockpit_core::DatabaseId;
use cockpit_core::Epoch;
use cockpit_core::InMemoryTimeSeries;
use cockpit_core::ManualClock;
use cockpit_core::MemoryAuditSink;
use cockpit_core::NoopAuditSink;
use cockpit_core::ThroughputCounter;
use cockpit_gateway::AgentClient;
use cockpit_gateway::Gateway;
use cockpit_store_sqlite::SqliteCounterStore;
use cockpit_store_sqlite::SqliteExecutor;
use system_tests::config::SystemTestConfig;
use tempfile::TempDir;

use super::journal::Journal;
use super::journal::RecordingChannel;

/// Identifier of the scenario's single database.
pub const DATABASE: &str = "hyrise-1";
/// Workload folder served by the generator.
pub const WORKLOAD: &str = "tpch_0.1";
/// Channel timeout used by the gateway.
const CHANNEL_TIMEOUT: Duration = Duration::from_secs(5);
/// Frame limit for every server.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Running fleet with a journaled gateway.
pub struct FleetHarness {
    pub gateway: Gateway,
    pub journal: Journal,
    pub audit: Arc<MemoryAuditSink>,
    pub store: Arc<InMemoryTimeSeries>,
    pub clock: Arc<ManualClock>,
    pub agent_counter: Arc<ThroughputCounter>,
    pub settings: SystemTestConfig,
    backend: Option<BackendRuntime>,
    agent_server: Option<ServerHandle>,
    agent_addr: SocketAddr,
    dir: TempDir,
}

impl FleetHarness {
    /// Starts a backend and an agent for `hyrise-1` under a fresh directory.
    pub fn start(name: &str) -> Self {
        let settings = SystemTestConfig::load().unwrap();
        let dir = scenario_dir(name, &settings);
        write_workload(dir.path());
        fs::create_dir_all(dir.path().join("databases")).unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();

        let backend = BackendRuntime::start(
            &backend_config(dir.path()),
            MAX_BODY_BYTES,
            Arc::new(NoopAuditSink),
        )
        .unwrap();

        let agent_counter = Arc::new(ThroughputCounter::new(
            DatabaseId::new(DATABASE),
            Arc::new(AtomicCounterStore::new()),
        ));
        let executor = SqliteExecutor::open(&database_file(dir.path()), 2).unwrap();
        let agent = InstanceAgent::new(
            Arc::new(executor),
            Arc::clone(&agent_counter),
            StorageSnapshotCell::new(),
        );
        let agent_server = ControlServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            ServerSettings::new(ChannelKind::InstanceAgent.as_str())
                .with_max_body_bytes(MAX_BODY_BYTES),
            agent,
        )
        .unwrap();
        let agent_addr = agent_server.local_addr();

        let journal = Journal::default();
        let audit = Arc::new(MemoryAuditSink::new());
        let store = Arc::new(InMemoryTimeSeries::new());
        let clock = Arc::new(ManualClock::new(0));
        let audit_sink: Arc<dyn AuditSink> = audit.clone();
        let gateway = Gateway::new(
            recorded(ChannelKind::FleetManager, backend.fleet_addr(), &journal),
            recorded(ChannelKind::WorkloadGenerator, backend.generator_addr(), &journal),
            store.clone(),
            clock.clone(),
            Epoch::from_millis(1_000).unwrap(),
            audit_sink,
        )
        .with_agent_limits(CHANNEL_TIMEOUT, MAX_BODY_BYTES);

        Self {
            gateway,
            journal,
            audit,
            store,
            clock,
            agent_counter,
            settings,
            backend: Some(backend),
            agent_server: Some(agent_server),
            agent_addr,
            dir,
        }
    }

    /// Registers `hyrise-1` with the Fleet Manager.
    pub fn register_database(&self, number_workers: u32) {
        self.gateway
            .fleet()
            .add_database(&AddDatabaseRequest {
                id: DatabaseId::new(DATABASE),
                number_workers,
                user: "cockpit".to_string(),
                password: String::new(),
                host: "localhost".to_string(),
                port: 5432,
                dbname: DATABASE.to_string(),
            })
            .unwrap();
    }

    /// Client for the scenario's agent.
    pub fn agent(&self) -> AgentClient {
        self.gateway.agent(&self.agent_addr.to_string()).unwrap()
    }

    /// Stops the agent server; later agent calls fail to connect.
    pub fn stop_agent(&mut self) {
        if let Some(server) = self.agent_server.take() {
            server.shutdown();
        }
    }

    /// Successful worker executions for `hyrise-1` not yet flushed.
    ///
    /// Reads the counter file the backend's workers increment.
    pub fn worker_executions(&self) -> u64 {
        let store = SqliteCounterStore::open(&counter_file(self.dir.path())).unwrap();
        store.peek(&DatabaseId::new(DATABASE)).unwrap()
    }

    /// Root of the scenario directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Polls `condition` until it holds or the scenario deadline passes.
    pub fn wait_until(&self, what: &str, mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + self.settings.wait(Duration::from_secs(5));
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for FleetHarness {
    fn drop(&mut self) {
        if let Some(server) = self.agent_server.take() {
            server.shutdown();
        }
        if let Some(backend) = self.backend.take() {
            backend.shutdown();
        }
    }
}

/// Wraps a schema-validated channel to `addr` in a journal recorder.
pub fn recorded(
    kind: ChannelKind,
    addr: SocketAddr,
    journal: &Journal,
) -> Arc<dyn CommandChannel> {
    let settings =
        ChannelSettings::new(kind.as_str(), addr.to_string()).with_timeout(CHANNEL_TIMEOUT);
    let channel = ControlChannel::new(settings, Arc::new(ResponseValidator::new(kind).unwrap()));
    Arc::new(RecordingChannel::new(Arc::new(channel), journal.clone()))
}

fn backend_config(root: &Path) -> BackendConfig {
    BackendConfig {
        fleet_bind: "127.0.0.1:0".to_string(),
        generator_bind: "127.0.0.1:0".to_string(),
        data_root: root.join("data").display().to_string(),
        workloads_root: root.join("workloads").display().to_string(),
        driver: DriverConfig::Sqlite {
            root: root.join("databases").display().to_string(),
        },
        counter: CounterConfig::Sqlite {
            path: counter_file(root).display().to_string(),
        },
    }
}

fn counter_file(root: &Path) -> PathBuf {
    root.join("counters.sqlite3")
}

fn database_file(root: &Path) -> PathBuf {
    root.join("databases").join(format!("{DATABASE}.sqlite3"))
}

fn write_workload(root: &Path) {
    let folder = root.join("workloads").join(WORKLOAD);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("01.sql"), "SELECT 1;").unwrap();
    fs::write(folder.join("06.sql"), "SELECT 6;").unwrap();
}

fn scenario_dir(name: &str, settings: &SystemTestConfig) -> TempDir {
    let mut builder = tempfile::Builder::new();
    builder.prefix(name).disable_cleanup(settings.keep_artifacts);
    match &settings.run_root {
        Some(root) => {
            fs::create_dir_all(root).unwrap();
            builder.tempdir_in(root).unwrap()
        }
        None => builder.tempdir().unwrap(),
    }
}
