// crates/cockpit-gateway/src/orchestrator.rs
// ============================================================================
// Module: Orchestration Engine
// Description: Multi-step workflows across the Fleet Manager and Workload Generator.
// Purpose: Sequence control commands with abort-on-first-failure semantics.
// Dependencies: cockpit-channel, cockpit-contract, cockpit-core, serde_json
// ============================================================================

//! ## Overview
//! A [`Workflow`] expands into a fixed list of [`WorkflowStep`]s. Steps run
//! in order on their target channel; the first failing step that aborts ends
//! the run and its error is returned. Earlier steps are never compensated:
//! a worker pool started by `start workload` stays running when the
//! generator refuses to start.
//!
//! Workflow runs are serialized through one lease so steps of two runs
//! never interleave on the shared channels.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use cockpit_channel::CommandChannel;
use cockpit_contract::FleetCommand;
use cockpit_contract::GeneratorCommand;
use cockpit_contract::bodies::StartWorkloadRequest;
use cockpit_core::AuditSink;
use cockpit_core::ControlMessage;
use cockpit_core::NoopAuditSink;
use cockpit_core::StatusCode;
use cockpit_core::WorkflowAuditEvent;
use cockpit_core::empty_body;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Channel a workflow step is issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget {
    /// Fleet Manager channel.
    FleetManager,
    /// Workload Generator channel.
    WorkloadGenerator,
}

/// One command within a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStep {
    /// Channel the command is sent on.
    pub target: StepTarget,
    /// Wire command name.
    pub command: &'static str,
    /// Request body.
    pub body: Value,
    /// Message used when the remote reports failure without an error text.
    pub default_error: &'static str,
    /// Whether a failure ends the workflow.
    pub abort_on_failure: bool,
}

/// Named workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    /// Start worker pools, then start query generation.
    StartWorkload {
        /// Workload folder replayed by the generator.
        folder_name: String,
        /// Queries per second.
        frequency: u32,
    },
    /// Stop query generation, then close worker pools.
    StopWorkload,
}

impl Workflow {
    /// Returns the stable workflow name used in audit events.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartWorkload {
                ..
            } => "start_workload",
            Self::StopWorkload => "stop_workload",
        }
    }

    /// Returns the ordered steps of the workflow.
    #[must_use]
    pub fn steps(&self) -> Vec<WorkflowStep> {
        match self {
            Self::StartWorkload {
                folder_name,
                frequency,
            } => {
                let body = serde_json::to_value(StartWorkloadRequest {
                    folder_name: folder_name.clone(),
                    frequency: *frequency,
                })
                .unwrap_or_else(|_| empty_body());
                vec![
                    WorkflowStep {
                        target: StepTarget::FleetManager,
                        command: FleetCommand::StartWorker.wire_name(),
                        body: empty_body(),
                        default_error: "Error during starting of worker",
                        abort_on_failure: true,
                    },
                    WorkflowStep {
                        target: StepTarget::WorkloadGenerator,
                        command: GeneratorCommand::StartWorkload.wire_name(),
                        body,
                        default_error: "Error during starting of the workload",
                        abort_on_failure: true,
                    },
                ]
            }
            Self::StopWorkload => vec![
                WorkflowStep {
                    target: StepTarget::WorkloadGenerator,
                    command: GeneratorCommand::StopWorkload.wire_name(),
                    body: empty_body(),
                    default_error: "Error during stopping of generator",
                    abort_on_failure: true,
                },
                WorkflowStep {
                    target: StepTarget::FleetManager,
                    command: FleetCommand::CloseWorker.wire_name(),
                    body: empty_body(),
                    default_error: "Error during closing of worker",
                    abort_on_failure: true,
                },
            ],
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Workflow failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The first step reported a non-success status.
    #[error("{message}")]
    Command {
        /// Failing step index.
        step: usize,
        /// Failing command.
        command: String,
        /// Reported status.
        status: StatusCode,
        /// Remote error message or the step's default message.
        message: String,
    },
    /// A later step failed after earlier steps already took effect.
    #[error("{message}")]
    PartialFailure {
        /// Failing step index.
        step: usize,
        /// Failing command.
        command: String,
        /// Reported status.
        status: StatusCode,
        /// Remote error message or the step's default message.
        message: String,
        /// Commands that succeeded before the failure.
        completed: Vec<String>,
    },
    /// The channel failed before a reply could be trusted.
    #[error("{message}")]
    Channel {
        /// Failing step index.
        step: usize,
        /// Failing command.
        command: String,
        /// Channel error kind label.
        kind: &'static str,
        /// Channel error detail.
        message: String,
    },
}

impl WorkflowError {
    /// Returns the status reported in the workflow envelope.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Command {
                status, ..
            }
            | Self::PartialFailure {
                status, ..
            } => *status,
            Self::Channel {
                ..
            } => StatusCode::SERVER_ERROR,
        }
    }

    /// Returns the index of the failing step.
    #[must_use]
    pub const fn step(&self) -> usize {
        match self {
            Self::Command {
                step, ..
            }
            | Self::PartialFailure {
                step, ..
            }
            | Self::Channel {
                step, ..
            } => *step,
        }
    }
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Uniform workflow result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowEnvelope {
    /// Status code.
    pub status: u16,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowEnvelope {
    /// Builds the envelope for a workflow outcome.
    #[must_use]
    pub fn from_result(result: &Result<(), WorkflowError>) -> Self {
        match result {
            Ok(()) => Self {
                status: StatusCode::OK.as_u16(),
                error: None,
            },
            Err(err) => Self {
                status: err.status().as_u16(),
                error: Some(err.to_string()),
            },
        }
    }

    /// Returns true for a success envelope.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Runs workflows over the Fleet Manager and Workload Generator channels.
pub struct Orchestrator {
    /// Fleet Manager channel.
    fleet: Arc<dyn CommandChannel>,
    /// Workload Generator channel.
    generator: Arc<dyn CommandChannel>,
    /// Workflow step audit sink.
    audit: Arc<dyn AuditSink>,
    /// Serializes workflow runs.
    lease: Mutex<()>,
}

impl Orchestrator {
    /// Creates an orchestrator over two channels.
    #[must_use]
    pub fn new(fleet: Arc<dyn CommandChannel>, generator: Arc<dyn CommandChannel>) -> Self {
        Self {
            fleet,
            generator,
            audit: Arc::new(NoopAuditSink),
            lease: Mutex::new(()),
        }
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Starts worker pools, then starts generating `folder_name` at `frequency`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] for the first failing step.
    pub fn start_workload(&self, folder_name: &str, frequency: u32) -> Result<(), WorkflowError> {
        self.run(&Workflow::StartWorkload {
            folder_name: folder_name.to_string(),
            frequency,
        })
    }

    /// Stops generation, then closes worker pools.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] for the first failing step.
    pub fn stop_workload(&self) -> Result<(), WorkflowError> {
        self.run(&Workflow::StopWorkload)
    }

    /// Runs a workflow step by step.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] for the first failing step. When a failing
    /// step does not abort, later steps still run and the first failure is
    /// returned at the end.
    pub fn run(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        let _lease = self.lease.lock().unwrap_or_else(PoisonError::into_inner);
        let mut completed: Vec<String> = Vec::new();
        let mut first_failure: Option<WorkflowError> = None;
        for (index, step) in workflow.steps().into_iter().enumerate() {
            match self.run_step(index, &step, &completed) {
                Ok(()) => {
                    self.audit.record_workflow(&WorkflowAuditEvent::new(
                        workflow.name(),
                        index,
                        step.command,
                        true,
                        None,
                    ));
                    completed.push(step.command.to_string());
                }
                Err(err) => {
                    self.audit.record_workflow(&WorkflowAuditEvent::new(
                        workflow.name(),
                        index,
                        step.command,
                        false,
                        Some(err.to_string()),
                    ));
                    if step.abort_on_failure {
                        return Err(err);
                    }
                    first_failure.get_or_insert(err);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    /// Issues one step and classifies its outcome.
    fn run_step(
        &self,
        index: usize,
        step: &WorkflowStep,
        completed: &[String],
    ) -> Result<(), WorkflowError> {
        let channel = match step.target {
            StepTarget::FleetManager => &self.fleet,
            StepTarget::WorkloadGenerator => &self.generator,
        };
        let reply = channel
            .send(&ControlMessage::request(step.command, step.body.clone()))
            .map_err(|err| WorkflowError::Channel {
                step: index,
                command: step.command.to_string(),
                kind: err.kind_label(),
                message: err.to_string(),
            })?;
        if reply.is_success() {
            return Ok(());
        }
        let status = reply.status().unwrap_or(StatusCode::SERVER_ERROR);
        let message = reply.error_message().unwrap_or(step.default_error).to_string();
        if completed.is_empty() {
            return Err(WorkflowError::Command {
                step: index,
                command: step.command.to_string(),
                status,
                message,
            });
        }
        Err(WorkflowError::PartialFailure {
            step: index,
            command: step.command.to_string(),
            status,
            message,
            completed: completed.to_vec(),
        })
    }
}
