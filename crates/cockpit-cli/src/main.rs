// crates/cockpit-cli/src/main.rs
// ============================================================================
// Module: Cockpit CLI Entry Point
// Description: Command dispatcher for service runtimes and gateway commands.
// Purpose: Start fleet services and drive them from the command line.
// Dependencies: clap, cockpit-cli, cockpit-config, cockpit-gateway, tokio
// ============================================================================

//! ## Overview
//! `cockpit serve` starts a long-running service and blocks until Ctrl-C.
//! Every other command builds a gateway from configuration, issues its
//! calls, prints one JSON document on stdout, and exits. Failures go to
//! stderr with a non-zero exit code. Gateway calls block, so they run on
//! the blocking pool rather than on runtime workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use cockpit_cli::AgentRuntime;
use cockpit_cli::BackendRuntime;
use cockpit_cli::audit_sink;
use cockpit_config::CockpitConfig;
use cockpit_config::config_toml_example;
use cockpit_contract::bodies::AddDatabaseRequest;
use cockpit_core::DatabaseId;
use cockpit_gateway::Gateway;
use cockpit_gateway::MetricKind;
use cockpit_gateway::WorkflowEnvelope;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Command-line interface for the cockpit fleet control plane.
#[derive(Parser, Debug)]
#[command(name = "cockpit", version, disable_help_subcommand = true)]
struct Cli {
    /// Configuration file; falls back to `COCKPIT_CONFIG`, then `cockpit.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected command.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a long-lived service.
    Serve {
        /// Selected service.
        #[command(subcommand)]
        command: ServeCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Start or stop the fleet-wide workload.
    Workload {
        /// Selected workload subcommand.
        #[command(subcommand)]
        command: WorkloadCommand,
    },
    /// Print one aggregated metric for the current window.
    Monitor(MonitorCommand),
    /// Fleet Manager commands.
    Fleet {
        /// Selected fleet subcommand.
        #[command(subcommand)]
        command: FleetCommand,
    },
    /// Instance Agent commands.
    Agent {
        /// Selected agent subcommand.
        #[command(subcommand)]
        command: AgentCommand,
    },
}

/// Services started by `serve`.
#[derive(Subcommand, Debug)]
enum ServeCommand {
    /// Instance Agent bound to the `[agent]` database.
    Agent,
    /// Fleet Manager and Workload Generator from `[backend]`.
    Backend,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration file.
    Validate,
    /// Print an annotated example configuration.
    Example,
}

/// Workload subcommands.
#[derive(Subcommand, Debug)]
enum WorkloadCommand {
    /// Start worker pools, then task generation.
    Start(WorkloadStartCommand),
    /// Stop task generation, then worker pools.
    Stop,
}

/// Arguments for `workload start`.
#[derive(Args, Debug)]
struct WorkloadStartCommand {
    /// Workload folder under the generator's workloads root.
    #[arg(long, value_name = "FOLDER")]
    folder: String,
    /// Tasks generated per second.
    #[arg(long, value_name = "N", default_value_t = 200)]
    frequency: u32,
}

/// Arguments for `monitor`.
#[derive(Args, Debug)]
struct MonitorCommand {
    /// Metric name, e.g. `throughput` or `detailed_latency`.
    #[arg(value_name = "METRIC")]
    metric: String,
}

/// Fleet Manager subcommands.
#[derive(Subcommand, Debug)]
enum FleetCommand {
    /// List registered databases.
    Databases,
    /// Register a database.
    Add(FleetAddCommand),
    /// Remove a database.
    Remove(DatabaseArgs),
    /// Per-database status.
    Status,
    /// Pending tasks per database.
    QueueLength,
    /// Active plugins per database.
    Plugins,
    /// Activate a plugin on one database.
    Activate(PluginArgs),
    /// Deactivate a plugin on one database.
    Deactivate(PluginArgs),
    /// Plugin settings per database.
    Settings,
    /// Set one plugin setting on one database.
    SetSetting(SetSettingArgs),
    /// Load a benchmark data folder into every database.
    Load(FolderArgs),
    /// Drop a benchmark data folder from every database.
    Unload(FolderArgs),
}

/// Arguments for `fleet add`.
#[derive(Args, Debug)]
struct FleetAddCommand {
    /// Fleet-unique database identifier.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Host name or address.
    #[arg(long, value_name = "HOST")]
    host: String,
    /// TCP port.
    #[arg(long, value_name = "PORT", default_value_t = 5432)]
    port: u16,
    /// Login user.
    #[arg(long, value_name = "USER")]
    user: String,
    /// Login password.
    #[arg(long, value_name = "PASSWORD", default_value = "")]
    password: String,
    /// Database name.
    #[arg(long, value_name = "NAME")]
    dbname: String,
    /// Worker pool size.
    #[arg(long, value_name = "N", default_value_t = 1)]
    workers: u32,
}

/// Database selector.
#[derive(Args, Debug)]
struct DatabaseArgs {
    /// Database identifier.
    #[arg(long, value_name = "ID")]
    id: String,
}

/// Plugin selector on one database.
#[derive(Args, Debug)]
struct PluginArgs {
    /// Database identifier.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Plugin name.
    #[arg(long, value_name = "PLUGIN")]
    plugin: String,
}

/// Arguments for `fleet set-setting`.
#[derive(Args, Debug)]
struct SetSettingArgs {
    /// Database identifier.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Setting name.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// New value.
    #[arg(long, value_name = "VALUE")]
    value: String,
}

/// Benchmark data folder selector.
#[derive(Args, Debug)]
struct FolderArgs {
    /// Data folder, e.g. `tpch_0.1`.
    #[arg(long, value_name = "FOLDER")]
    folder: String,
}

/// Instance Agent subcommands.
#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Last completed epoch's throughput.
    Throughput(AgentArgs),
    /// Latest storage snapshot.
    Storage(AgentArgs),
}

/// Agent selector.
#[derive(Args, Debug)]
struct AgentArgs {
    /// Agent control address, e.g. `127.0.0.1:9001`.
    #[arg(long, value_name = "ADDR")]
    endpoint: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            command,
        } => command_serve(cli.config, command).await,
        Commands::Config {
            command,
        } => command_config(cli.config, &command),
        command => {
            let config = load_config(cli.config)?;
            tokio::task::spawn_blocking(move || command_gateway(&config, command))
                .await
                .map_err(|err| CliError::new(format!("command task failed: {err}")))?
        }
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Handle of whichever service `serve` started.
enum Service {
    /// Instance Agent runtime.
    Agent(AgentRuntime),
    /// Backend runtime.
    Backend(BackendRuntime),
}

impl Service {
    /// Stops the service and joins its threads.
    fn shutdown(self) {
        match self {
            Self::Agent(runtime) => runtime.shutdown(),
            Self::Backend(runtime) => runtime.shutdown(),
        }
    }
}

/// Executes the `serve` command.
async fn command_serve(path: Option<PathBuf>, command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(path)?;
    let service = tokio::task::spawn_blocking(move || start_service(&config, &command))
        .await
        .map_err(|err| CliError::new(format!("service init join failed: {err}")))??;
    let started = match &service {
        Service::Agent(runtime) => json!({
            "service": "instance_agent",
            "addr": runtime.local_addr().to_string(),
        }),
        Service::Backend(runtime) => json!({
            "service": "backend",
            "fleet_manager": runtime.fleet_addr().to_string(),
            "workload_generator": runtime.generator_addr().to_string(),
        }),
    };
    if let Err(err) = write_json(&started) {
        shutdown_service(service).await?;
        return Err(err);
    }

    let signal = tokio::signal::ctrl_c().await;
    shutdown_service(service).await?;
    signal.map_err(|err| CliError::new(format!("signal handler failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Stops `service` on a blocking thread; database pools close synchronously.
async fn shutdown_service(service: Service) -> CliResult<()> {
    tokio::task::spawn_blocking(move || service.shutdown())
        .await
        .map_err(|err| CliError::new(format!("service shutdown join failed: {err}")))
}

/// Starts the service selected by `command`.
fn start_service(config: &CockpitConfig, command: &ServeCommand) -> CliResult<Service> {
    let audit = audit_sink(&config.audit).map_err(|err| CliError::new(err.to_string()))?;
    let max_body_bytes = config.limits.max_body_bytes;
    match command {
        ServeCommand::Agent => {
            let agent = config.require_agent().map_err(|err| CliError::new(err.to_string()))?;
            AgentRuntime::start(agent, max_body_bytes, audit)
                .map(Service::Agent)
                .map_err(|err| CliError::new(format!("instance agent failed to start: {err}")))
        }
        ServeCommand::Backend => {
            let backend = config.require_backend().map_err(|err| CliError::new(err.to_string()))?;
            BackendRuntime::start(backend, max_body_bytes, audit)
                .map(Service::Backend)
                .map_err(|err| CliError::new(format!("backend failed to start: {err}")))
        }
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(path: Option<PathBuf>, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            let config = load_config(path)?;
            write_json(&json!({
                "valid": true,
                "agent": config.agent.is_some(),
                "backend": config.backend.is_some(),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error(&err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads and validates configuration.
fn load_config(path: Option<PathBuf>) -> CliResult<CockpitConfig> {
    CockpitConfig::load(path.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Gateway Commands
// ============================================================================

/// Builds a gateway and runs one gateway-side command.
fn command_gateway(config: &CockpitConfig, command: Commands) -> CliResult<ExitCode> {
    let audit = audit_sink(&config.audit).map_err(|err| CliError::new(err.to_string()))?;
    let gateway =
        Gateway::from_config(config, audit).map_err(|err| CliError::new(err.to_string()))?;
    match command {
        Commands::Workload {
            command,
        } => command_workload(&gateway, &command),
        Commands::Monitor(command) => command_monitor(&gateway, &command),
        Commands::Fleet {
            command,
        } => command_fleet(&gateway, command),
        Commands::Agent {
            command,
        } => command_agent(&gateway, &command),
        Commands::Serve {
            ..
        }
        | Commands::Config {
            ..
        } => Err(CliError::new("command does not use the gateway".to_string())),
    }
}

/// Executes a workload workflow and prints its envelope.
fn command_workload(gateway: &Gateway, command: &WorkloadCommand) -> CliResult<ExitCode> {
    let result = match command {
        WorkloadCommand::Start(args) => {
            gateway.orchestrator().start_workload(&args.folder, args.frequency)
        }
        WorkloadCommand::Stop => gateway.orchestrator().stop_workload(),
    };
    let envelope = WorkflowEnvelope::from_result(&result);
    write_json(&envelope)?;
    Ok(if envelope.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints one aggregated metric.
fn command_monitor(gateway: &Gateway, command: &MonitorCommand) -> CliResult<ExitCode> {
    let Some(metric) = MetricKind::parse(&command.metric) else {
        let known: Vec<&str> = MetricKind::ALL.iter().map(|kind| kind.as_str()).collect();
        return Err(CliError::new(format!(
            "unknown metric `{}`; expected one of: {}",
            command.metric,
            known.join(", ")
        )));
    };
    let report = gateway.metrics().report(metric).map_err(|err| CliError::new(err.to_string()))?;
    write_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes one Fleet Manager command.
fn command_fleet(gateway: &Gateway, command: FleetCommand) -> CliResult<ExitCode> {
    let fleet = gateway.fleet();
    let output = match command {
        FleetCommand::Databases => to_json(&fleet.databases().map_err(client_error)?)?,
        FleetCommand::Add(args) => {
            let request = AddDatabaseRequest {
                id: DatabaseId::new(args.id),
                number_workers: args.workers,
                user: args.user,
                password: args.password,
                host: args.host,
                port: args.port,
                dbname: args.dbname,
            };
            fleet.add_database(&request).map_err(client_error)?;
            done()
        }
        FleetCommand::Remove(args) => {
            fleet.delete_database(&DatabaseId::new(args.id)).map_err(client_error)?;
            done()
        }
        FleetCommand::Status => to_json(&fleet.status().map_err(client_error)?)?,
        FleetCommand::QueueLength => to_json(&fleet.queue_length().map_err(client_error)?)?,
        FleetCommand::Plugins => to_json(&fleet.plugins().map_err(client_error)?)?,
        FleetCommand::Activate(args) => {
            fleet.activate_plugin(&DatabaseId::new(args.id), &args.plugin).map_err(client_error)?;
            done()
        }
        FleetCommand::Deactivate(args) => {
            fleet.deactivate_plugin(&DatabaseId::new(args.id), &args.plugin).map_err(client_error)?;
            done()
        }
        FleetCommand::Settings => to_json(&fleet.plugin_settings().map_err(client_error)?)?,
        FleetCommand::SetSetting(args) => {
            fleet
                .set_plugin_setting(&DatabaseId::new(args.id), &args.name, &args.value)
                .map_err(client_error)?;
            done()
        }
        FleetCommand::Load(args) => {
            fleet.load_data(&args.folder).map_err(client_error)?;
            done()
        }
        FleetCommand::Unload(args) => {
            fleet.delete_data(&args.folder).map_err(client_error)?;
            done()
        }
    };
    write_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes one Instance Agent command.
fn command_agent(gateway: &Gateway, command: &AgentCommand) -> CliResult<ExitCode> {
    let (AgentCommand::Throughput(args) | AgentCommand::Storage(args)) = command;
    let agent = gateway.agent(&args.endpoint).map_err(|err| CliError::new(err.to_string()))?;
    let output = match command {
        AgentCommand::Throughput(_) => {
            json!({ "throughput": agent.throughput().map_err(client_error)? })
        }
        AgentCommand::Storage(_) => {
            json!({ "storage": agent.storage_data().map_err(client_error)? })
        }
    };
    write_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Maps a client failure to a CLI error carrying the remote status.
fn client_error(err: cockpit_gateway::ClientError) -> CliError {
    CliError::new(format!("{err} (status {})", err.status().as_u16()))
}

/// Body printed by commands that return nothing.
fn done() -> Value {
    json!({ "status": 200 })
}

/// Serializes `value` into a JSON value.
fn to_json<T: Serialize>(value: &T) -> CliResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| CliError::new(format!("failed to encode output: {err}")))
}

/// Writes `value` as pretty JSON on stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to encode output: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error(&err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure.
fn output_error(error: &std::io::Error) -> String {
    format!("failed to write stdout: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
