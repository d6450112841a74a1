// crates/cockpit-fleet/tests/fleet.rs
// ============================================================================
// Module: Fleet Manager Tests
// Description: Registry, worker pools, plugins, data loading, and dispatch.
// Purpose: Validate Fleet Manager commands against SQLite and stub drivers.
// Dependencies: cockpit-fleet, cockpit-contract, cockpit-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Exercises [`FleetManager`] directly and through [`FleetService`], checking
//! replies against the Fleet Manager response schemas.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use cockpit_channel::CommandHandler;
use cockpit_contract::ChannelKind;
use cockpit_contract::FleetCommand;
use cockpit_contract::ResponseValidator;
use cockpit_core::ControlMessage;
use cockpit_core::CounterStore;
use cockpit_core::DatabaseDriver;
use cockpit_core::DatabaseId;
use cockpit_core::LoadedTable;
use cockpit_core::QueryTask;
use cockpit_core::StatusCode;
use cockpit_core::WorkerPoolStatus;
use cockpit_core::empty_body;
use cockpit_fleet::FleetError;
use cockpit_fleet::FleetService;
use cockpit_fleet::WorkloadSink;
use cockpit_store_sqlite::SqliteDriver;
use common::add_request;
use common::descriptor;
use common::gated_fleet;
use common::sqlite_fleet;
use common::wait_until;
use common::write_table;
use serde_json::json;

fn task(sql: &str) -> QueryTask {
    QueryTask {
        sql: sql.to_string(),
        benchmark: "mini".to_string(),
        query_no: "01".to_string(),
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

#[test]
fn add_database_registers_stopped_instance() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 2)).unwrap();
    let databases = f.manager.databases().unwrap();
    assert_eq!(databases.len(), 1);
    assert_eq!(databases[0].id.as_str(), "hyrise-1");
    assert_eq!(databases[0].number_workers, 2);
    assert_eq!(databases[0].worker_pool_status, WorkerPoolStatus::Stopped);
    let events = f.audit.events_named("registry_change");
    assert_eq!(events.last().unwrap()["action"], "add");
    assert_eq!(events.last().unwrap()["ok"], true);
}

#[test]
fn duplicate_id_conflicts_and_keeps_original() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 2)).unwrap();
    let mut duplicate = add_request("hyrise-1", 8);
    duplicate.dbname = "elsewhere".to_string();
    let err = f.manager.add_database(&duplicate).unwrap_err();
    assert!(matches!(err, FleetError::Conflict(_)));
    let instance = f.manager.database(&DatabaseId::new("hyrise-1")).unwrap();
    assert_eq!(instance.number_workers, 2);
    assert_eq!(instance.connection.dbname, "hyrise-1");
}

#[test]
fn failed_validation_creates_no_instance() {
    let f = sqlite_fleet();
    let mut request = add_request("hyrise-1", 2);
    request.dbname = "../escape".to_string();
    let err = f.manager.add_database(&request).unwrap_err();
    assert!(matches!(err, FleetError::ConnectionInvalid(_)));
    assert!(err.to_string().starts_with("Database connection refused"));
    assert!(f.manager.databases().unwrap().is_empty());
    let events = f.audit.events_named("registry_change");
    assert_eq!(events.last().unwrap()["ok"], false);
}

#[test]
fn delete_database_removes_instance() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    f.manager.add_database(&add_request("hyrise-2", 1)).unwrap();
    f.manager.delete_database(&DatabaseId::new("hyrise-1")).unwrap();
    let ids: Vec<_> = f.manager.databases().unwrap().into_iter().map(|db| db.id).collect();
    assert_eq!(ids, vec![DatabaseId::new("hyrise-2")]);
    let err = f.manager.delete_database(&DatabaseId::new("hyrise-1")).unwrap_err();
    assert!(matches!(err, FleetError::NotFound(_)));
}

// ============================================================================
// SECTION: Worker Pools
// ============================================================================

#[test]
fn running_workers_execute_and_count_per_database() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 2)).unwrap();
    f.manager.add_database(&add_request("hyrise-2", 1)).unwrap();
    assert_eq!(f.manager.submit(&task("SELECT 1")), 0);

    f.manager.start_workers().unwrap();
    f.manager.start_workers().unwrap();
    for _ in 0 .. 5 {
        assert_eq!(f.manager.submit(&task("SELECT 1")), 2);
    }
    let counters = Arc::clone(&f.counters);
    wait_until(Duration::from_secs(5), || {
        counters.peek(&DatabaseId::new("hyrise-1")).unwrap() == 5
            && counters.peek(&DatabaseId::new("hyrise-2")).unwrap() == 5
    });
    let status = f.manager.status().unwrap();
    assert!(status.iter().all(|entry| entry.worker_pool_status == WorkerPoolStatus::Running));

    f.manager.close_workers().unwrap();
    assert_eq!(f.manager.submit(&task("SELECT 1")), 0);
    let queues = f.manager.queue_lengths().unwrap();
    assert!(queues.iter().all(|entry| entry.queue_length == 0));
}

#[test]
fn failed_tasks_are_not_counted() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    f.manager.start_workers().unwrap();
    f.manager.submit(&task("SELECT * FROM missing_table"));
    f.manager.submit(&task("SELECT 1"));
    let counters = Arc::clone(&f.counters);
    wait_until(Duration::from_secs(5), || {
        counters.peek(&DatabaseId::new("hyrise-1")).unwrap() == 1
    });
    f.manager.close_workers().unwrap();
    assert_eq!(f.counters.peek(&DatabaseId::new("hyrise-1")).unwrap(), 1);
}

#[test]
fn queue_length_reports_pending_tasks() {
    let (f, gate, _) = gated_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    gate.close();
    f.manager.start_workers().unwrap();
    for _ in 0 .. 4 {
        f.manager.submit(&task("SELECT 1"));
    }
    let manager = Arc::clone(&f.manager);
    wait_until(Duration::from_secs(5), || manager.queue_lengths().unwrap()[0].queue_length == 3);
    gate.open();
    wait_until(Duration::from_secs(5), || manager.queue_lengths().unwrap()[0].queue_length == 0);
    f.manager.close_workers().unwrap();
}

// ============================================================================
// SECTION: Plugins
// ============================================================================

#[test]
fn plugin_activation_is_per_database() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    f.manager.add_database(&add_request("hyrise-2", 1)).unwrap();
    f.manager.activate_plugin(&DatabaseId::new("hyrise-1"), "CompressionPlugin").unwrap();

    let plugins = f.manager.plugins().unwrap();
    assert_eq!(plugins[0].plugins, vec!["CompressionPlugin".to_string()]);
    assert!(plugins[1].plugins.is_empty());

    let settings = f.manager.plugin_settings().unwrap();
    let setting = &settings[0].plugin_settings[0];
    assert_eq!(setting.name, "CompressionPlugin_MemoryBudget");
    assert_eq!(setting.value, "5000");
    assert!(setting.description.starts_with("The memory budget"));
    assert!(settings[1].plugin_settings.is_empty());
}

#[test]
fn setting_requires_active_plugin() {
    let f = sqlite_fleet();
    let id = DatabaseId::new("hyrise-1");
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    let err =
        f.manager.set_plugin_setting(&id, "CompressionPlugin_MemoryBudget", "9000").unwrap_err();
    assert!(matches!(err, FleetError::Plugin(_)));
    assert!(err.to_string().contains("not active"));

    f.manager.activate_plugin(&id, "CompressionPlugin").unwrap();
    f.manager.set_plugin_setting(&id, "CompressionPlugin_MemoryBudget", "9000").unwrap();
    f.manager.deactivate_plugin(&id, "CompressionPlugin").unwrap();
    f.manager.activate_plugin(&id, "CompressionPlugin").unwrap();
    assert_eq!(f.manager.plugin_settings().unwrap()[0].plugin_settings[0].value, "9000");

    let err = f.manager.set_plugin_setting(&id, "CompressionPlugin_Nope", "1").unwrap_err();
    assert!(matches!(err, FleetError::Plugin(_)));
}

#[test]
fn unknown_or_inactive_plugins_are_rejected() {
    let f = sqlite_fleet();
    let id = DatabaseId::new("hyrise-1");
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    assert!(matches!(f.manager.activate_plugin(&id, "MagicPlugin"), Err(FleetError::Plugin(_))));
    assert!(matches!(
        f.manager.deactivate_plugin(&id, "ClusteringPlugin"),
        Err(FleetError::Plugin(_))
    ));
    assert!(matches!(
        f.manager.activate_plugin(&DatabaseId::new("nope"), "ClusteringPlugin"),
        Err(FleetError::NotFound(_))
    ));
}

// ============================================================================
// SECTION: Benchmark Data
// ============================================================================

#[test]
fn load_data_creates_tables_and_reports_benchmark() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    f.manager.load_data("mini").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));

    let status = &f.manager.status().unwrap()[0];
    assert!(!status.database_blocked_status);
    assert_eq!(status.loaded_benchmarks, vec!["mini".to_string()]);
    assert_eq!(status.loaded_tables.len(), 2);
    assert_eq!(status.last_load_error, None);

    let executor =
        SqliteDriver::new(f.databases_root()).open_pool(&descriptor("hyrise-1"), 1).unwrap();
    executor.execute("SELECT n_nationkey FROM nation").unwrap();

    f.manager.load_data("mini").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
    assert_eq!(f.manager.status().unwrap()[0].loaded_tables.len(), 2);
}

#[test]
fn failed_load_is_reported_in_status_until_a_clean_reload() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    write_table(
        &f.data_root(),
        "mini",
        "region",
        "CREATE TABLE region (r_regionkey INTEGER); INSERT INTO absent VALUES (1);",
    );
    f.manager.load_data("mini").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));

    let status = &f.manager.status().unwrap()[0];
    assert!(status.loaded_benchmarks.is_empty());
    let error = status.last_load_error.as_deref().unwrap();
    assert!(error.contains("loading `region` failed"), "{error}");
    let completions = f.audit.events_named("registry_change");
    assert!(
        completions
            .iter()
            .any(|event| event["action"] == "load_data_complete" && event["ok"] == false)
    );

    write_table(
        &f.data_root(),
        "mini",
        "region",
        "DROP TABLE IF EXISTS region; CREATE TABLE region (r_regionkey INTEGER);",
    );
    f.manager.load_data("mini").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
    let status = &f.manager.status().unwrap()[0];
    assert_eq!(status.loaded_benchmarks, vec!["mini".to_string()]);
    assert_eq!(status.last_load_error, None);
}

#[test]
fn load_data_rejects_unknown_folders_and_missing_files() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    assert!(matches!(f.manager.load_data("tpch_1"), Err(FleetError::Data(_))));
    assert!(matches!(f.manager.load_data(".."), Err(FleetError::Data(_))));
    std::fs::remove_file(f.data_root().join("mini").join("region.sql")).unwrap();
    let err = f.manager.load_data("mini").unwrap_err();
    assert!(err.to_string().contains("region.sql"));
    assert!(!f.manager.status().unwrap()[0].database_blocked_status);
}

#[test]
fn overlapping_tables_from_another_folder_are_rejected() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    f.manager.load_data("mini").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
    let err = f.manager.load_data("other").unwrap_err();
    assert!(err.to_string().contains("already loaded from `mini`"));
}

#[test]
fn loading_blocks_the_instance_until_done() {
    let (f, gate, statements) = gated_fleet();
    let id = DatabaseId::new("hyrise-1");
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    gate.close();
    f.manager.load_data("mini").unwrap();

    let status = &f.manager.status().unwrap()[0];
    assert!(status.database_blocked_status);
    assert_eq!(status.worker_pool_status, WorkerPoolStatus::Blocked);
    assert!(matches!(f.manager.start_workers(), Err(FleetError::Blocked(_))));
    assert!(matches!(f.manager.delete_database(&id), Err(FleetError::Blocked(_))));
    assert!(matches!(f.manager.load_data("mini"), Err(FleetError::Blocked(_))));
    assert!(!f.manager.wait_until_unblocked(Duration::from_millis(50)));

    gate.open();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
    assert_eq!(statements.lock().unwrap().len(), 2);
    f.manager.start_workers().unwrap();
    f.manager.close_workers().unwrap();
    let completions = f.audit.events_named("registry_change");
    assert!(
        completions
            .iter()
            .any(|event| event["action"] == "load_data_complete" && event["ok"] == true)
    );
}

#[test]
fn delete_data_drops_loaded_tables() {
    let f = sqlite_fleet();
    f.manager.add_database(&add_request("hyrise-1", 1)).unwrap();
    f.manager.load_data("mini").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
    f.manager.delete_data("mini").unwrap();

    let status = &f.manager.status().unwrap()[0];
    assert!(status.loaded_tables.is_empty());
    assert!(status.loaded_benchmarks.is_empty());
    let executor =
        SqliteDriver::new(f.databases_root()).open_pool(&descriptor("hyrise-1"), 1).unwrap();
    assert!(executor.execute("SELECT n_nationkey FROM nation").is_err());

    f.manager.load_data("other").unwrap();
    assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
    assert_eq!(
        f.manager.status().unwrap()[0].loaded_tables,
        vec![LoadedTable {
            table_name: "nation".to_string(),
            benchmark: "other".to_string(),
        }]
    );
}

// ============================================================================
// SECTION: Service
// ============================================================================

fn call(service: &mut FleetService, command: &str, body: serde_json::Value) -> ControlMessage {
    service.handle(ControlMessage::request(command, body))
}

#[test]
fn service_replies_match_response_schemas() {
    let f = sqlite_fleet();
    let validator = ResponseValidator::new(ChannelKind::FleetManager).unwrap();
    let mut service = FleetService::new(Arc::clone(&f.manager));
    let add = json!({
        "id": "hyrise-1",
        "number_workers": 2,
        "user": "bench",
        "password": "secret",
        "host": "localhost",
        "port": 5432,
        "dbname": "hyrise-1",
    });
    assert!(call(&mut service, "add database", add).is_success());
    let activate = json!({ "id": "hyrise-1", "plugin": "CompressionPlugin" });
    assert!(call(&mut service, "activate plugin", activate).is_success());
    for command in FleetCommand::ALL {
        let body = match command {
            FleetCommand::AddDatabase | FleetCommand::DeleteDatabase => continue,
            FleetCommand::ActivatePlugin | FleetCommand::DeactivatePlugin => {
                json!({ "id": "hyrise-1", "plugin": "ClusteringPlugin" })
            }
            FleetCommand::SetPluginSetting => json!({
                "id": "hyrise-1",
                "name": "CompressionPlugin_MemoryBudget",
                "value": "7000",
            }),
            FleetCommand::LoadData | FleetCommand::DeleteData => json!({ "folder_name": "mini" }),
            _ => empty_body(),
        };
        let reply = call(&mut service, command.wire_name(), body);
        assert!(reply.is_success(), "{}: {:?}", command.wire_name(), reply.error_message());
        let raw = serde_json::to_value(&reply).unwrap();
        validator.validate(command.wire_name(), &raw).unwrap();
        if command == FleetCommand::LoadData {
            assert!(f.manager.wait_until_unblocked(Duration::from_secs(5)));
        }
    }
}

#[test]
fn service_rejects_unknown_commands_and_bad_bodies() {
    let f = sqlite_fleet();
    let mut service = FleetService::new(Arc::clone(&f.manager));
    let reply = call(&mut service, "reboot fleet", empty_body());
    assert_eq!(reply.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(reply.command(), "reboot fleet");

    let reply = call(&mut service, "add database", json!({ "id": "hyrise-1" }));
    assert_eq!(reply.status(), Some(StatusCode::BAD_REQUEST));
    assert!(reply.error_message().unwrap().starts_with("invalid parameters"));
    assert!(f.manager.databases().unwrap().is_empty());

    let reply = call(&mut service, "delete database", json!({ "id": "ghost" }));
    assert_eq!(reply.status(), Some(StatusCode::BAD_REQUEST));
    assert!(reply.error_message().unwrap().contains("not found"));
}
