// crates/cockpit-gateway/src/lib.rs
// ============================================================================
// Module: Cockpit Gateway
// Description: Gateway-side clients, workflows, and metrics aggregation.
// Purpose: Drive the fleet through validated control channels.
// Dependencies: cockpit-channel, cockpit-config, cockpit-contract, cockpit-core, reqwest
// ============================================================================

//! ## Overview
//! The gateway talks to the Fleet Manager, the Workload Generator, and
//! Instance Agents only through schema-validated control channels. The
//! [`Orchestrator`] sequences multi-step workflows, and the
//! [`MetricsAggregator`] reads the time-series store over lagged windows.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clients;
pub mod gateway;
pub mod influx;
pub mod metrics;
pub mod orchestrator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clients::AgentClient;
pub use clients::ClientError;
pub use clients::FleetClient;
pub use clients::GeneratorClient;
pub use gateway::Gateway;
pub use gateway::GatewayError;
pub use influx::InfluxSettings;
pub use influx::InfluxTimeSeries;
pub use metrics::AggregatorError;
pub use metrics::MetricKind;
pub use metrics::MetricsAggregator;
pub use orchestrator::Orchestrator;
pub use orchestrator::StepTarget;
pub use orchestrator::Workflow;
pub use orchestrator::WorkflowEnvelope;
pub use orchestrator::WorkflowError;
pub use orchestrator::WorkflowStep;
