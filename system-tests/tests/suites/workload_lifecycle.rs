// system-tests/tests/suites/workload_lifecycle.rs
// ============================================================================
// Module: Workload Lifecycle Scenarios
// Description: Register, start, query, measure, and stop over live services.
// Purpose: Exercise every service boundary in one end-to-end flow.
// Dependencies: helpers, cockpit-core, cockpit-gateway
// ============================================================================

//! ## Overview
//! Scenarios start from an empty fleet, register `hyrise-1`, and drive it
//! through the gateway exactly as an operator would.

use cockpit_core::DatabaseId;
use cockpit_core::MetricSample;
use cockpit_core::TagSet;
use cockpit_core::WorkerPoolStatus;
use cockpit_gateway::metrics::SUCCESSFUL_QUERIES;

use crate::helpers::harness::DATABASE;
use crate::helpers::harness::FleetHarness;
use crate::helpers::harness::WORKLOAD;
use crate::helpers::journal::JournalEntry;

fn pool_status(fleet: &FleetHarness) -> WorkerPoolStatus {
    let status = fleet.gateway.fleet().status().unwrap();
    assert_eq!(status.len(), 1);
    status[0].worker_pool_status
}

#[test]
fn hyrise_1_workload_round_trip() {
    let fleet = FleetHarness::start("round_trip");
    fleet.register_database(2);
    let databases = fleet.gateway.fleet().databases().unwrap();
    assert_eq!(databases.len(), 1);
    assert_eq!(databases[0].id, DatabaseId::new(DATABASE));

    fleet.gateway.orchestrator().start_workload(WORKLOAD, 200).unwrap();
    assert_eq!(pool_status(&fleet), WorkerPoolStatus::Running);

    let agent = fleet.agent();
    agent.query("SELECT 1;").unwrap();
    agent.query("SELECT 6;").unwrap();
    assert_eq!(agent.throughput().unwrap(), 0);
    let report = fleet.agent_counter.flush().unwrap();
    assert_eq!(report.throughput, 2);
    assert_eq!(agent.throughput().unwrap(), 2);

    let mark = fleet.journal.len();
    fleet.gateway.orchestrator().stop_workload().unwrap();
    assert_eq!(
        fleet.journal.since(mark),
        vec![
            JournalEntry::new("workload_generator", "stop workload"),
            JournalEntry::new("fleet_manager", "close worker"),
        ]
    );
    assert_eq!(pool_status(&fleet), WorkerPoolStatus::Stopped);
    assert_eq!(fleet.audit.events_named("workflow_step").len(), 4);
}

#[test]
fn generated_tasks_are_executed_by_workers() {
    let fleet = FleetHarness::start("start_order");
    fleet.register_database(1);
    let mark = fleet.journal.len();
    fleet.gateway.orchestrator().start_workload(WORKLOAD, 50).unwrap();
    assert_eq!(
        fleet.journal.since(mark),
        vec![
            JournalEntry::new("fleet_manager", "start worker"),
            JournalEntry::new("workload_generator", "start workload"),
        ]
    );
    fleet.wait_until("worker executions for hyrise-1", || fleet.worker_executions() >= 5);
    fleet.gateway.orchestrator().stop_workload().unwrap();

    let drained = fleet.gateway.fleet().queue_length().unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].queue_length, 0);
}

#[test]
fn fleet_wide_metrics_cover_registered_databases() {
    let fleet = FleetHarness::start("metrics");
    fleet.register_database(1);
    fleet.clock.set(10_000_000_000);

    let throughput = fleet.gateway.metrics().throughput().unwrap();
    assert_eq!(throughput.get(&DatabaseId::new(DATABASE)), Some(&0));

    fleet
        .store
        .record_sample(
            SUCCESSFUL_QUERIES,
            MetricSample {
                timestamp_ns: 8_500_000_000,
                database_id: DatabaseId::new(DATABASE),
                tags: TagSet {
                    benchmark: WORKLOAD.to_string(),
                    query_no: "01".to_string(),
                },
                value: 4.0,
            },
        )
        .unwrap();
    let throughput = fleet.gateway.metrics().throughput().unwrap();
    assert_eq!(throughput.get(&DatabaseId::new(DATABASE)), Some(&1));
    let latency = fleet.gateway.metrics().latency().unwrap();
    assert!((latency[&DatabaseId::new(DATABASE)] - 4.0).abs() < f64::EPSILON);
}
