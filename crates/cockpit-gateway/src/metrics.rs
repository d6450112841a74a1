// crates/cockpit-gateway/src/metrics.rs
// ============================================================================
// Module: Metrics Aggregator
// Description: Lagged-window aggregates and latest snapshots across the fleet.
// Purpose: Reshape time-series rows into per-database and per-query reports.
// Dependencies: cockpit-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every aggregate call computes one [`AggregationWindow`] `(now - 2e, now - e]`
//! and reads each member database over that window. Fleet membership comes
//! from the Fleet Manager; when that lookup fails the call fails before any
//! store query is issued.
//!
//! Fleet-wide reads report every member: a database without samples reports
//! `0` (or `{}` for snapshots). Detailed reads list only the
//! `(benchmark, query_no)` groups observed in the window.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use cockpit_core::AggregateKind;
use cockpit_core::AggregateQuery;
use cockpit_core::AggregateRow;
use cockpit_core::AggregationWindow;
use cockpit_core::Clock;
use cockpit_core::DatabaseId;
use cockpit_core::Epoch;
use cockpit_core::SnapshotRecord;
use cockpit_core::StatusCode;
use cockpit_core::TimeSeriesError;
use cockpit_core::TimeSeriesStore;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::clients::FleetClient;

// ============================================================================
// SECTION: Measurements
// ============================================================================

/// Successful query measurement; one sample per executed query.
pub const SUCCESSFUL_QUERIES: &str = "successful_queries";
/// Latency field of [`SUCCESSFUL_QUERIES`].
pub const LATENCY_FIELD: &str = "latency";
/// Failed query measurement.
pub const FAILED_QUERIES: &str = "failed_queries";
/// Storage snapshot measurement.
pub const STORAGE: &str = "storage";
/// System snapshot measurement.
pub const SYSTEM_DATA: &str = "system_data";
/// Chunk access snapshot measurement.
pub const CHUNKS_DATA: &str = "chunks_data";
/// Plugin log measurement.
pub const PLUGIN_LOG: &str = "plugin_log";
/// Failed queries returned per database.
pub const FAILED_TASKS_LIMIT: usize = 100;
/// Plugin log entries returned per database.
pub const PLUGIN_LOG_LIMIT: usize = 1000;

/// Snapshot field holding the storage report.
const STORAGE_FIELD: &str = "storage_meta_information";
/// Snapshot field holding the chunk report.
const CHUNKS_FIELD: &str = "chunks_data_meta_information";
/// Snapshot fields of the system report.
const SYSTEM_FIELDS: [&str; 3] = ["cpu", "memory", "database_threads"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Aggregation failures; all surface as a generic server error.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// Fleet membership could not be read.
    #[error("fleet membership lookup failed: {0}")]
    Membership(String),
    /// The time-series store failed.
    #[error("{0}")]
    Store(String),
    /// A stored field could not be decoded.
    #[error("undecodable field `{field}` in `{measurement}`: {detail}")]
    Decode {
        /// Measurement read.
        measurement: String,
        /// Field that failed to decode.
        field: String,
        /// Decoder detail.
        detail: String,
    },
}

impl AggregatorError {
    /// Returns the status reported to callers.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        StatusCode::SERVER_ERROR
    }
}

impl From<TimeSeriesError> for AggregatorError {
    fn from(err: TimeSeriesError) -> Self {
        Self::Store(err.to_string())
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Query count for one tag group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryThroughput {
    /// Benchmark tag.
    pub benchmark: String,
    /// Query number tag.
    pub query_number: String,
    /// Executions in the window.
    pub throughput: u64,
}

/// Mean latency for one tag group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLatency {
    /// Benchmark tag.
    pub benchmark: String,
    /// Query number tag.
    pub query_number: String,
    /// Mean latency in the window.
    pub latency: f64,
}

/// Count and mean latency for one tag group, read from the same query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInformation {
    /// Benchmark tag.
    pub benchmark: String,
    /// Query number tag.
    pub query_number: String,
    /// Executions in the window.
    pub throughput: u64,
    /// Mean latency in the window.
    pub latency: f64,
}

/// Per-database detailed throughput.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedThroughput {
    /// Database identifier.
    pub id: DatabaseId,
    /// Observed tag groups.
    pub detailed_throughput: Vec<QueryThroughput>,
}

/// Per-database detailed latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedLatency {
    /// Database identifier.
    pub id: DatabaseId,
    /// Observed tag groups.
    pub detailed_latency: Vec<QueryLatency>,
}

/// Per-database combined query information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseQueryInformation {
    /// Database identifier.
    pub id: DatabaseId,
    /// Observed tag groups.
    pub query_information: Vec<QueryInformation>,
}

/// Recent failed queries of one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTasks {
    /// Database identifier.
    pub id: DatabaseId,
    /// Failed query records, newest first.
    pub failed_queries: Vec<Map<String, Value>>,
}

/// One plugin log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginLogEntry {
    /// Log time.
    pub timestamp: i64,
    /// Reporting plugin.
    pub reporter: String,
    /// Log message.
    pub message: String,
}

/// Plugin log of one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabasePluginLog {
    /// Database identifier.
    pub id: DatabaseId,
    /// Log lines, oldest first.
    pub plugin_log: Vec<PluginLogEntry>,
}

// ============================================================================
// SECTION: Metric Names
// ============================================================================

/// Metrics available to monitoring callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Fleet-wide throughput.
    Throughput,
    /// Fleet-wide mean latency.
    Latency,
    /// Per-query throughput.
    DetailedThroughput,
    /// Per-query latency.
    DetailedLatency,
    /// Per-query throughput and latency.
    QueryInformation,
    /// Latest storage snapshot.
    Storage,
    /// Latest system snapshot.
    System,
    /// Latest chunk access snapshot.
    Chunks,
    /// Recent failed queries.
    FailedTasks,
    /// Plugin log.
    PluginLog,
}

impl MetricKind {
    /// All metrics in display order.
    pub const ALL: [Self; 10] = [
        Self::Throughput,
        Self::Latency,
        Self::DetailedThroughput,
        Self::DetailedLatency,
        Self::QueryInformation,
        Self::Storage,
        Self::System,
        Self::Chunks,
        Self::FailedTasks,
        Self::PluginLog,
    ];

    /// Returns the stable metric name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Throughput => "throughput",
            Self::Latency => "latency",
            Self::DetailedThroughput => "detailed_throughput",
            Self::DetailedLatency => "detailed_latency",
            Self::QueryInformation => "query_information",
            Self::Storage => "storage",
            Self::System => "system",
            Self::Chunks => "chunks",
            Self::FailedTasks => "failed_tasks",
            Self::PluginLog => "plugin_log",
        }
    }

    /// Parses a metric name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Gateway-side metrics aggregator.
pub struct MetricsAggregator {
    /// Fleet membership source.
    fleet: FleetClient,
    /// Time-series store.
    store: Arc<dyn TimeSeriesStore>,
    /// Wall clock.
    clock: Arc<dyn Clock>,
    /// Reporting epoch.
    epoch: Epoch,
}

impl MetricsAggregator {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(
        fleet: FleetClient,
        store: Arc<dyn TimeSeriesStore>,
        clock: Arc<dyn Clock>,
        epoch: Epoch,
    ) -> Self {
        Self {
            fleet,
            store,
            clock,
            epoch,
        }
    }

    /// Returns the window an aggregate call made now would read.
    #[must_use]
    pub fn window(&self) -> AggregationWindow {
        AggregationWindow::lagged(self.clock.now_ns(), self.epoch)
    }

    /// Returns executions per database; databases without samples report 0.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn throughput(&self) -> Result<BTreeMap<DatabaseId, u64>, AggregatorError> {
        let window = self.window();
        self.members()?
            .into_iter()
            .map(|id| {
                let rows = self
                    .store
                    .aggregate(&latency_query(&id, window, AggregateKind::Count, false))?;
                let count = rows.first().and_then(|row| row.count).unwrap_or(0);
                Ok((id, count))
            })
            .collect()
    }

    /// Returns mean latency per database; databases without samples report 0.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn latency(&self) -> Result<BTreeMap<DatabaseId, f64>, AggregatorError> {
        let window = self.window();
        self.members()?
            .into_iter()
            .map(|id| {
                let rows = self
                    .store
                    .aggregate(&latency_query(&id, window, AggregateKind::Mean, false))?;
                let mean = rows.first().and_then(|row| row.mean).unwrap_or(0.0);
                Ok((id, mean))
            })
            .collect()
    }

    /// Returns per-query executions for each database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn detailed_throughput(&self) -> Result<Vec<DetailedThroughput>, AggregatorError> {
        let window = self.window();
        self.members()?
            .into_iter()
            .map(|id| {
                let rows = self
                    .store
                    .aggregate(&latency_query(&id, window, AggregateKind::Count, true))?;
                let detailed_throughput = grouped(rows)
                    .map(|(benchmark, query_number, row)| QueryThroughput {
                        benchmark,
                        query_number,
                        throughput: row.count.unwrap_or(0),
                    })
                    .collect();
                Ok(DetailedThroughput {
                    id,
                    detailed_throughput,
                })
            })
            .collect()
    }

    /// Returns per-query mean latency for each database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn detailed_latency(&self) -> Result<Vec<DetailedLatency>, AggregatorError> {
        let window = self.window();
        self.members()?
            .into_iter()
            .map(|id| {
                let rows = self
                    .store
                    .aggregate(&latency_query(&id, window, AggregateKind::Mean, true))?;
                let detailed_latency = grouped(rows)
                    .map(|(benchmark, query_number, row)| QueryLatency {
                        benchmark,
                        query_number,
                        latency: row.mean.unwrap_or(0.0),
                    })
                    .collect();
                Ok(DetailedLatency {
                    id,
                    detailed_latency,
                })
            })
            .collect()
    }

    /// Returns per-query executions and mean latency from one query per database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn query_information(&self) -> Result<Vec<DatabaseQueryInformation>, AggregatorError> {
        let window = self.window();
        self.members()?
            .into_iter()
            .map(|id| {
                let query = latency_query(&id, window, AggregateKind::CountAndMean, true);
                let rows = self.store.aggregate(&query)?;
                let query_information = grouped(rows)
                    .map(|(benchmark, query_number, row)| QueryInformation {
                        benchmark,
                        query_number,
                        throughput: row.count.unwrap_or(0),
                        latency: row.mean.unwrap_or(0.0),
                    })
                    .collect();
                Ok(DatabaseQueryInformation {
                    id,
                    query_information,
                })
            })
            .collect()
    }

    /// Returns the latest storage report per database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership, a read, or decoding fails.
    pub fn storage(&self) -> Result<BTreeMap<DatabaseId, Map<String, Value>>, AggregatorError> {
        self.latest_field(STORAGE, STORAGE_FIELD)
    }

    /// Returns the latest chunk access report per database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership, a read, or decoding fails.
    pub fn chunks(&self) -> Result<BTreeMap<DatabaseId, Map<String, Value>>, AggregatorError> {
        self.latest_field(CHUNKS_DATA, CHUNKS_FIELD)
    }

    /// Returns the latest `cpu`, `memory`, and `database_threads` per database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership, a read, or decoding fails.
    pub fn system(&self) -> Result<BTreeMap<DatabaseId, Map<String, Value>>, AggregatorError> {
        self.members()?
            .into_iter()
            .map(|id| {
                let mut system = Map::new();
                if let Some(record) = self.store.latest(&id, SYSTEM_DATA)? {
                    for field in SYSTEM_FIELDS {
                        system.insert(
                            field.to_string(),
                            decode_field(&record, SYSTEM_DATA, field)?,
                        );
                    }
                }
                Ok((id, system))
            })
            .collect()
    }

    /// Returns the most recent failed queries per database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn failed_tasks(&self) -> Result<Vec<FailedTasks>, AggregatorError> {
        self.members()?
            .into_iter()
            .map(|id| {
                let failed_queries = self
                    .store
                    .recent(&id, FAILED_QUERIES, FAILED_TASKS_LIMIT)?
                    .into_iter()
                    .map(|record| {
                        let mut fields = record.fields;
                        fields.entry("time").or_insert_with(|| Value::from(record.timestamp_ns));
                        fields
                    })
                    .collect();
                Ok(FailedTasks {
                    id,
                    failed_queries,
                })
            })
            .collect()
    }

    /// Returns the plugin log per database.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when membership or a store read fails.
    pub fn plugin_log(&self) -> Result<Vec<DatabasePluginLog>, AggregatorError> {
        self.members()?
            .into_iter()
            .map(|id| {
                let mut plugin_log: Vec<PluginLogEntry> = self
                    .store
                    .recent(&id, PLUGIN_LOG, PLUGIN_LOG_LIMIT)?
                    .into_iter()
                    .map(|record| PluginLogEntry {
                        timestamp: record
                            .fields
                            .get("timestamp")
                            .and_then(Value::as_i64)
                            .unwrap_or(record.timestamp_ns),
                        reporter: text_field(&record, "reporter"),
                        message: text_field(&record, "message"),
                    })
                    .collect();
                plugin_log.reverse();
                Ok(DatabasePluginLog {
                    id,
                    plugin_log,
                })
            })
            .collect()
    }

    /// Renders one metric as the JSON document served to monitoring callers.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] when the underlying read fails.
    pub fn report(&self, metric: MetricKind) -> Result<Value, AggregatorError> {
        match metric {
            MetricKind::Throughput => keyed("throughput", &self.throughput()?),
            MetricKind::Latency => keyed("latency", &self.latency()?),
            MetricKind::DetailedThroughput => to_value(&self.detailed_throughput()?),
            MetricKind::DetailedLatency => to_value(&self.detailed_latency()?),
            MetricKind::QueryInformation => to_value(&self.query_information()?),
            MetricKind::Storage => keyed("storage", &self.storage()?),
            MetricKind::System => keyed("system_data", &self.system()?),
            MetricKind::Chunks => keyed("chunks_data", &self.chunks()?),
            MetricKind::FailedTasks => to_value(&self.failed_tasks()?),
            MetricKind::PluginLog => to_value(&self.plugin_log()?),
        }
    }

    /// Reads fleet membership; any failure aborts the caller.
    fn members(&self) -> Result<Vec<DatabaseId>, AggregatorError> {
        let databases =
            self.fleet.databases().map_err(|err| AggregatorError::Membership(err.to_string()))?;
        Ok(databases.into_iter().map(|database| database.id).collect())
    }

    /// Reads the latest value of one JSON field per database.
    fn latest_field(
        &self,
        measurement: &str,
        field: &str,
    ) -> Result<BTreeMap<DatabaseId, Map<String, Value>>, AggregatorError> {
        self.members()?
            .into_iter()
            .map(|id| {
                let report = match self.store.latest(&id, measurement)? {
                    Some(record) => match decode_field(&record, measurement, field)? {
                        Value::Object(map) => map,
                        other => {
                            return Err(AggregatorError::Decode {
                                measurement: measurement.to_string(),
                                field: field.to_string(),
                                detail: format!("expected an object, found {other}"),
                            });
                        }
                    },
                    None => Map::new(),
                };
                Ok((id, report))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a query over the latency field of successful queries.
fn latency_query(
    database: &DatabaseId,
    window: AggregationWindow,
    kind: AggregateKind,
    group_by_tags: bool,
) -> AggregateQuery {
    AggregateQuery {
        database: database.clone(),
        measurement: SUCCESSFUL_QUERIES.to_string(),
        field: LATENCY_FIELD.to_string(),
        window,
        kind,
        group_by_tags,
    }
}

/// Yields `(benchmark, query_number, row)` for tagged rows.
fn grouped(rows: Vec<AggregateRow>) -> impl Iterator<Item = (String, String, AggregateRow)> {
    rows.into_iter().filter_map(|row| {
        let tags = row.tags.clone()?;
        Some((tags.benchmark, tags.query_no, row))
    })
}

/// Decodes a snapshot field stored as JSON text; structured values pass through.
fn decode_field(
    record: &SnapshotRecord,
    measurement: &str,
    field: &str,
) -> Result<Value, AggregatorError> {
    let decode_error = |detail: String| AggregatorError::Decode {
        measurement: measurement.to_string(),
        field: field.to_string(),
        detail,
    };
    match record.fields.get(field) {
        Some(Value::String(text)) => {
            serde_json::from_str(text).map_err(|err| decode_error(err.to_string()))
        }
        Some(value) => Ok(value.clone()),
        None => Err(decode_error("field missing".to_string())),
    }
}

/// Returns a string field or an empty string.
fn text_field(record: &SnapshotRecord, field: &str) -> String {
    record.fields.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Serializes a report.
fn to_value<T: Serialize>(report: &T) -> Result<Value, AggregatorError> {
    serde_json::to_value(report).map_err(|err| AggregatorError::Store(err.to_string()))
}

/// Serializes a report under a single top-level key.
fn keyed<T: Serialize>(key: &str, report: &T) -> Result<Value, AggregatorError> {
    let mut document = Map::new();
    document.insert(key.to_string(), to_value(report)?);
    Ok(Value::Object(document))
}
