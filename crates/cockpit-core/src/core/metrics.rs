// crates/cockpit-core/src/core/metrics.rs
// ============================================================================
// Module: Cockpit Metric Types
// Description: Time-series samples, aggregate queries, and aggregate rows.
// Purpose: Define the read contract between the aggregator and the store.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Samples are produced outside the control plane and are immutable here.
//! An [`AggregateQuery`] asks for a count and/or mean of one field over one
//! window, optionally grouped by the `(benchmark, query_no)` tag pair.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::DatabaseId;
use crate::core::time::AggregationWindow;

// ============================================================================
// SECTION: Samples
// ============================================================================

/// Grouping tags attached to a query sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagSet {
    /// Benchmark the query belongs to.
    pub benchmark: String,
    /// Query number within the benchmark.
    pub query_no: String,
}

/// One measured value read from the time-series store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Sample time (unix nanoseconds).
    pub timestamp_ns: i64,
    /// Database the sample belongs to.
    pub database_id: DatabaseId,
    /// Grouping tags.
    pub tags: TagSet,
    /// Measured value (for example latency).
    pub value: f64,
}

/// Latest-value record for snapshot measurements (storage, system, chunks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Record time (unix nanoseconds).
    pub timestamp_ns: i64,
    /// Field values keyed by field name.
    pub fields: Map<String, Value>,
}

// ============================================================================
// SECTION: Aggregates
// ============================================================================

/// Aggregate functions requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Number of samples.
    Count,
    /// Arithmetic mean of sample values.
    Mean,
    /// Count and mean computed in the same query.
    CountAndMean,
}

impl AggregateKind {
    /// Returns true when the count is requested.
    #[must_use]
    pub const fn wants_count(self) -> bool {
        matches!(self, Self::Count | Self::CountAndMean)
    }

    /// Returns true when the mean is requested.
    #[must_use]
    pub const fn wants_mean(self) -> bool {
        matches!(self, Self::Mean | Self::CountAndMean)
    }
}

/// Windowed aggregate query against one database's series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateQuery {
    /// Database whose series is read.
    pub database: DatabaseId,
    /// Measurement name.
    pub measurement: String,
    /// Field aggregated.
    pub field: String,
    /// Time window `(start, end]`.
    pub window: AggregationWindow,
    /// Aggregate functions.
    pub kind: AggregateKind,
    /// Group rows by `(benchmark, query_no)` when true.
    pub group_by_tags: bool,
}

/// One aggregate row; one per tag group, or a single row when ungrouped.
///
/// # Invariants
/// - The store returns no row for an empty group; zero-filling is the
///   caller's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Group tags; `None` for ungrouped queries.
    pub tags: Option<TagSet>,
    /// Sample count when requested.
    pub count: Option<u64>,
    /// Mean value when requested.
    pub mean: Option<f64>,
}
