// system-tests/tests/suites/failure_modes.rs
// ============================================================================
// Module: Failure Mode Scenarios
// Description: Unavailable services and failing workflow steps over TCP.
// Purpose: Prove failures surface as typed errors and later steps never run.
// Dependencies: helpers, cockpit-channel, cockpit-core, cockpit-gateway
// ============================================================================

//! ## Overview
//! Each scenario breaks one boundary (a missing workload folder, a stopped
//! agent, an unreachable Fleet Manager) and checks what the gateway issued.

use std::net::SocketAddr;
use std::net::TcpListener;
use std::sync::Arc;

use cockpit_channel::ChannelError;
use cockpit_contract::ChannelKind;
use cockpit_core::Epoch;
use cockpit_core::InMemoryTimeSeries;
use cockpit_core::ManualClock;
use cockpit_core::NoopAuditSink;
use cockpit_core::StatusCode;
use cockpit_core::WorkerPoolStatus;
use cockpit_gateway::AggregatorError;
use cockpit_gateway::ClientError;
use cockpit_gateway::Gateway;
use cockpit_gateway::WorkflowError;

use crate::helpers::harness::FleetHarness;
use crate::helpers::harness::recorded;
use crate::helpers::journal::Journal;
use crate::helpers::journal::JournalEntry;

/// Address nothing listens on.
fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[test]
fn unknown_workload_folder_leaves_workers_running_until_stopped() {
    let fleet = FleetHarness::start("unknown_folder");
    fleet.register_database(1);

    let err = fleet.gateway.orchestrator().start_workload("tpch_404", 200).unwrap_err();
    match &err {
        WorkflowError::PartialFailure {
            step,
            completed,
            ..
        } => {
            assert_eq!(*step, 1);
            assert_eq!(completed, &vec!["start worker".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    let status = fleet.gateway.fleet().status().unwrap();
    assert_eq!(status[0].worker_pool_status, WorkerPoolStatus::Running);

    fleet.gateway.orchestrator().stop_workload().unwrap();
    let status = fleet.gateway.fleet().status().unwrap();
    assert_eq!(status[0].worker_pool_status, WorkerPoolStatus::Stopped);
}

#[test]
fn stopped_agent_is_reported_unavailable() {
    let mut fleet = FleetHarness::start("agent_down");
    let agent = fleet.agent();
    assert_eq!(agent.throughput().unwrap(), 0);

    fleet.stop_agent();
    let err = agent.throughput().unwrap_err();
    assert!(matches!(
        err,
        ClientError::Channel(ChannelError::Unavailable {
            ..
        })
    ));
    assert_eq!(err.status(), StatusCode::SERVER_ERROR);
}

#[test]
fn unreachable_fleet_manager_aborts_before_the_generator() {
    let journal = Journal::default();
    let store = Arc::new(InMemoryTimeSeries::new());
    let gateway = Gateway::new(
        recorded(ChannelKind::FleetManager, closed_addr(), &journal),
        recorded(ChannelKind::WorkloadGenerator, closed_addr(), &journal),
        store.clone(),
        Arc::new(ManualClock::new(10_000_000_000)),
        Epoch::from_millis(1_000).unwrap(),
        Arc::new(NoopAuditSink),
    );

    let err = gateway.orchestrator().start_workload("tpch_0.1", 200).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Channel {
            step: 0,
            kind: "channel_unavailable",
            ..
        }
    ));
    assert_eq!(journal.since(0), vec![JournalEntry::new("fleet_manager", "start worker")]);

    let err = gateway.metrics().throughput().unwrap_err();
    assert!(matches!(err, AggregatorError::Membership(_)));
    assert_eq!(store.read_count(), 0);
    assert!(journal.commands_on("workload_generator").is_empty());
}
