// crates/cockpit-gateway/src/gateway.rs
// ============================================================================
// Module: Gateway Runtime
// Description: Wires channels, clients, orchestrator, and aggregator from config.
// Purpose: Provide one entry point for gateway-side control and monitoring.
// Dependencies: cockpit-channel, cockpit-config, cockpit-contract, cockpit-core
// ============================================================================

//! ## Overview
//! A [`Gateway`] owns one validated control channel per backend service.
//! Typed clients, the orchestrator, and the aggregator share those channels;
//! each channel serializes its own calls. Agent channels are built on demand.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use cockpit_channel::ChannelSettings;
use cockpit_channel::CommandChannel;
use cockpit_channel::ControlChannel;
use cockpit_config::CockpitConfig;
use cockpit_config::TimeSeriesConfig;
use cockpit_contract::ChannelKind;
use cockpit_contract::ResponseValidator;
use cockpit_core::AuditSink;
use cockpit_core::Clock;
use cockpit_core::Epoch;
use cockpit_core::InMemoryTimeSeries;
use cockpit_core::SystemClock;
use cockpit_core::TimeSeriesStore;
use thiserror::Error;

use crate::clients::AgentClient;
use crate::clients::FleetClient;
use crate::clients::GeneratorClient;
use crate::influx::InfluxSettings;
use crate::influx::InfluxTimeSeries;
use crate::metrics::MetricsAggregator;
use crate::orchestrator::Orchestrator;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway construction errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration value was rejected.
    #[error("gateway config error: {0}")]
    Config(String),
    /// Response schemas failed to compile.
    #[error("gateway contract error: {0}")]
    Contract(String),
    /// Time-series reader could not be built.
    #[error("gateway time-series error: {0}")]
    TimeSeries(String),
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Gateway-side control plane.
pub struct Gateway {
    /// Fleet Manager client.
    fleet: FleetClient,
    /// Workload Generator client.
    generator: GeneratorClient,
    /// Workflow engine.
    orchestrator: Orchestrator,
    /// Metrics aggregator.
    metrics: MetricsAggregator,
    /// Agent channel timeout.
    timeout: Duration,
    /// Agent channel frame limit.
    max_body_bytes: usize,
    /// Shared audit sink.
    audit: Arc<dyn AuditSink>,
}

impl Gateway {
    /// Builds the gateway described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the config, schemas, or store are invalid.
    pub fn from_config(
        config: &CockpitConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, GatewayError> {
        let gateway = &config.gateway;
        let epoch = gateway.epoch().map_err(|err| GatewayError::Config(err.to_string()))?;
        let timeout = gateway.request_timeout();
        let max_body_bytes = config.limits.max_body_bytes;
        let fleet = validated_channel(
            ChannelKind::FleetManager,
            &gateway.fleet_manager,
            timeout,
            max_body_bytes,
            &audit,
        )?;
        let generator = validated_channel(
            ChannelKind::WorkloadGenerator,
            &gateway.workload_generator,
            timeout,
            max_body_bytes,
            &audit,
        )?;
        let store = timeseries_store(&gateway.timeseries)?;
        Ok(Self::new(fleet, generator, store, Arc::new(SystemClock), epoch, audit)
            .with_agent_limits(timeout, max_body_bytes))
    }

    /// Builds a gateway over existing channels.
    #[must_use]
    pub fn new(
        fleet: Arc<dyn CommandChannel>,
        generator: Arc<dyn CommandChannel>,
        store: Arc<dyn TimeSeriesStore>,
        clock: Arc<dyn Clock>,
        epoch: Epoch,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let orchestrator = Orchestrator::new(Arc::clone(&fleet), Arc::clone(&generator))
            .with_audit(Arc::clone(&audit));
        let fleet = FleetClient::new(fleet);
        let metrics = MetricsAggregator::new(fleet.clone(), store, clock, epoch);
        let defaults = ChannelSettings::new(ChannelKind::InstanceAgent.as_str(), "");
        Self {
            fleet,
            generator: GeneratorClient::new(generator),
            orchestrator,
            metrics,
            timeout: defaults.timeout,
            max_body_bytes: defaults.max_body_bytes,
            audit,
        }
    }

    /// Sets the timeout and frame limit used for agent channels.
    #[must_use]
    pub const fn with_agent_limits(mut self, timeout: Duration, max_body_bytes: usize) -> Self {
        self.timeout = timeout;
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Returns the Fleet Manager client.
    #[must_use]
    pub const fn fleet(&self) -> &FleetClient {
        &self.fleet
    }

    /// Returns the Workload Generator client.
    #[must_use]
    pub const fn generator(&self) -> &GeneratorClient {
        &self.generator
    }

    /// Returns the workflow engine.
    #[must_use]
    pub const fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Returns the metrics aggregator.
    #[must_use]
    pub const fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Builds a client for the Instance Agent at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Contract`] when the agent schemas fail to compile.
    pub fn agent(&self, endpoint: &str) -> Result<AgentClient, GatewayError> {
        let channel = validated_channel(
            ChannelKind::InstanceAgent,
            endpoint,
            self.timeout,
            self.max_body_bytes,
            &self.audit,
        )?;
        Ok(AgentClient::new(channel))
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a schema-validated channel of `kind` to `endpoint`.
fn validated_channel(
    kind: ChannelKind,
    endpoint: &str,
    timeout: Duration,
    max_body_bytes: usize,
    audit: &Arc<dyn AuditSink>,
) -> Result<Arc<dyn CommandChannel>, GatewayError> {
    let validator =
        ResponseValidator::new(kind).map_err(|err| GatewayError::Contract(err.to_string()))?;
    let settings = ChannelSettings::new(kind.as_str(), endpoint)
        .with_timeout(timeout)
        .with_max_body_bytes(max_body_bytes);
    Ok(Arc::new(ControlChannel::new(settings, Arc::new(validator)).with_audit(Arc::clone(audit))))
}

/// Builds the configured time-series reader.
fn timeseries_store(config: &TimeSeriesConfig) -> Result<Arc<dyn TimeSeriesStore>, GatewayError> {
    match config {
        TimeSeriesConfig::Memory => Ok(Arc::new(InMemoryTimeSeries::new())),
        TimeSeriesConfig::Influx {
            url,
            user,
            password,
            timeout_ms,
        } => {
            let settings = InfluxSettings::new(url.clone(), Duration::from_millis(*timeout_ms))
                .with_credentials(user.clone(), password.clone());
            let store = InfluxTimeSeries::new(settings)
                .map_err(|err| GatewayError::TimeSeries(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}
