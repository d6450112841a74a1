// crates/cockpit-gateway/tests/orchestrator.rs
// ============================================================================
// Module: Orchestration Engine Tests
// Description: Step ordering, abort-on-first-failure, and result envelopes.
// Purpose: Prove later steps are never issued after an earlier failure.
// Dependencies: cockpit-gateway, cockpit-core
// ============================================================================

//! ## Overview
//! Runs both workflows over scripted channels and asserts exact call counts
//! on each channel.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use cockpit_core::AuditSink;
use cockpit_core::MemoryAuditSink;
use cockpit_core::StatusCode;
use cockpit_gateway::Orchestrator;
use cockpit_gateway::StepTarget;
use cockpit_gateway::Workflow;
use cockpit_gateway::WorkflowEnvelope;
use cockpit_gateway::WorkflowError;
use common::Reply;
use common::ScriptedChannel;
use serde_json::json;

fn orchestrator(
    fleet: ScriptedChannel,
    generator: ScriptedChannel,
) -> (Orchestrator, Arc<ScriptedChannel>, Arc<ScriptedChannel>) {
    let fleet = Arc::new(fleet);
    let generator = Arc::new(generator);
    (Orchestrator::new(fleet.clone(), generator.clone()), fleet, generator)
}

// ============================================================================
// SECTION: Workflow Shape
// ============================================================================

#[test]
fn workflows_run_in_reverse_order_of_each_other() {
    let start = Workflow::StartWorkload {
        folder_name: "tpch_0.1".to_string(),
        frequency: 200,
    }
    .steps();
    let stop = Workflow::StopWorkload.steps();

    assert_eq!(start[0].target, StepTarget::FleetManager);
    assert_eq!(start[0].command, "start worker");
    assert_eq!(start[1].target, StepTarget::WorkloadGenerator);
    assert_eq!(start[1].command, "start workload");
    assert_eq!(start[1].body, json!({ "folder_name": "tpch_0.1", "frequency": 200 }));
    assert_eq!(stop[0].target, StepTarget::WorkloadGenerator);
    assert_eq!(stop[0].command, "stop workload");
    assert_eq!(stop[1].target, StepTarget::FleetManager);
    assert_eq!(stop[1].command, "close worker");
    assert!(start.iter().chain(stop.iter()).all(|step| step.abort_on_failure));
}

// ============================================================================
// SECTION: Start Workload
// ============================================================================

#[test]
fn start_workload_issues_both_steps_in_order() {
    let (engine, fleet, generator) =
        orchestrator(ScriptedChannel::new("fleet"), ScriptedChannel::new("generator"));
    engine.start_workload("tpch_0.1", 200).unwrap();
    assert_eq!(fleet.calls(), vec!["start worker"]);
    assert_eq!(generator.calls(), vec!["start workload"]);
}

#[test]
fn start_workload_never_issues_step_two_after_step_one_fails() {
    let (engine, fleet, generator) = orchestrator(
        ScriptedChannel::new("fleet").reply(
            "start worker",
            Reply::Failure(
                StatusCode::BAD_REQUEST,
                Some("database `hyrise-1` is blocked".to_string()),
            ),
        ),
        ScriptedChannel::new("generator"),
    );
    let err = engine.start_workload("tpch_0.1", 200).unwrap_err();
    assert_eq!(err.to_string(), "database `hyrise-1` is blocked");
    assert!(matches!(err, WorkflowError::Command { step: 0, .. }));
    assert_eq!(fleet.count("start worker"), 1);
    assert_eq!(generator.calls().len(), 0);
}

#[test]
fn start_workload_uses_default_message_when_remote_omits_one() {
    let (engine, _fleet, generator) = orchestrator(
        ScriptedChannel::new("fleet")
            .reply("start worker", Reply::Failure(StatusCode::BAD_REQUEST, None)),
        ScriptedChannel::new("generator"),
    );
    let err = engine.start_workload("tpch_0.1", 200).unwrap_err();
    assert_eq!(err.to_string(), "Error during starting of worker");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(generator.calls().is_empty());
}

#[test]
fn start_workload_leaves_workers_running_when_generation_fails() {
    let (engine, fleet, generator) = orchestrator(
        ScriptedChannel::new("fleet"),
        ScriptedChannel::new("generator")
            .reply("start workload", Reply::Failure(StatusCode::BAD_REQUEST, None)),
    );
    let err = engine.start_workload("tpch_0.1", 200).unwrap_err();
    match err {
        WorkflowError::PartialFailure {
            step,
            command,
            message,
            completed,
            ..
        } => {
            assert_eq!(step, 1);
            assert_eq!(command, "start workload");
            assert_eq!(message, "Error during starting of the workload");
            assert_eq!(completed, vec!["start worker".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fleet.calls(), vec!["start worker"]);
    assert_eq!(generator.count("start workload"), 1);
}

#[test]
fn channel_failure_aborts_with_server_error() {
    let (engine, _fleet, generator) = orchestrator(
        ScriptedChannel::new("fleet").reply("start worker", Reply::Unavailable),
        ScriptedChannel::new("generator"),
    );
    let err = engine.start_workload("tpch_0.1", 200).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Channel {
            step: 0,
            kind: "channel_unavailable",
            ..
        }
    ));
    assert_eq!(err.status(), StatusCode::SERVER_ERROR);
    assert!(generator.calls().is_empty());
}

// ============================================================================
// SECTION: Stop Workload
// ============================================================================

#[test]
fn stop_workload_stops_generation_before_closing_workers() {
    let (engine, fleet, generator) =
        orchestrator(ScriptedChannel::new("fleet"), ScriptedChannel::new("generator"));
    engine.stop_workload().unwrap();
    assert_eq!(generator.calls(), vec!["stop workload"]);
    assert_eq!(fleet.calls(), vec!["close worker"]);
}

#[test]
fn stop_workload_never_issues_step_two_after_step_one_fails() {
    let (engine, fleet, generator) = orchestrator(
        ScriptedChannel::new("fleet"),
        ScriptedChannel::new("generator")
            .reply("stop workload", Reply::Failure(StatusCode::SERVER_ERROR, None)),
    );
    let err = engine.stop_workload().unwrap_err();
    assert_eq!(err.to_string(), "Error during stopping of generator");
    assert_eq!(generator.count("stop workload"), 1);
    assert_eq!(fleet.calls().len(), 0);
}

#[test]
fn stop_workload_protocol_violation_never_closes_workers() {
    let (engine, fleet, _generator) = orchestrator(
        ScriptedChannel::new("fleet"),
        ScriptedChannel::new("generator").reply("stop workload", Reply::Violation),
    );
    let err = engine.stop_workload().unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Channel {
            kind: "protocol_violation",
            ..
        }
    ));
    assert!(fleet.calls().is_empty());
}

#[test]
fn stop_workload_reports_close_failure_with_default_message() {
    let (engine, _fleet, _generator) = orchestrator(
        ScriptedChannel::new("fleet")
            .reply("close worker", Reply::Failure(StatusCode::BAD_REQUEST, None)),
        ScriptedChannel::new("generator"),
    );
    let err = engine.stop_workload().unwrap_err();
    assert_eq!(err.to_string(), "Error during closing of worker");
    assert_eq!(err.step(), 1);
}

// ============================================================================
// SECTION: Envelope and Audit
// ============================================================================

#[test]
fn envelope_carries_only_status_on_success() {
    let (engine, _fleet, _generator) =
        orchestrator(ScriptedChannel::new("fleet"), ScriptedChannel::new("generator"));
    let envelope = WorkflowEnvelope::from_result(&engine.stop_workload());
    assert!(envelope.is_success());
    assert_eq!(serde_json::to_value(&envelope).unwrap(), json!({ "status": 200 }));
}

#[test]
fn envelope_carries_error_on_failure() {
    let (engine, _fleet, _generator) = orchestrator(
        ScriptedChannel::new("fleet").reply("start worker", Reply::Violation),
        ScriptedChannel::new("generator"),
    );
    let envelope = WorkflowEnvelope::from_result(&engine.start_workload("tpch_0.1", 200));
    assert_eq!(envelope.status, 500);
    assert!(envelope.error.unwrap().contains("missing a required field"));
}

#[test]
fn every_issued_step_is_audited() {
    let audit = Arc::new(MemoryAuditSink::new());
    let sink: Arc<dyn AuditSink> = audit.clone();
    let generator = Arc::new(
        ScriptedChannel::new("generator")
            .reply("start workload", Reply::Failure(StatusCode::BAD_REQUEST, None)),
    );
    let engine =
        Orchestrator::new(Arc::new(ScriptedChannel::new("fleet")), generator).with_audit(sink);
    engine.start_workload("tpch_0.1", 200).unwrap_err();

    let events = audit.events_named("workflow_step");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["workflow"], "start_workload");
    assert_eq!(events[0]["command"], "start worker");
    assert_eq!(events[0]["ok"], true);
    assert_eq!(events[1]["step"], 1);
    assert_eq!(events[1]["ok"], false);
}
