// crates/cockpit-core/src/runtime/timeseries.rs
// ============================================================================
// Module: In-Memory Time Series
// Description: Process-local TimeSeriesStore for tests and local fleets.
// Purpose: Serve windowed count/mean queries without an external store.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Mirrors the read semantics of the external store: windows are `(start, end]`,
//! an ungrouped query over an empty window yields no rows, and grouped queries
//! only return groups that have samples.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::core::AggregateQuery;
use crate::core::AggregateRow;
use crate::core::DatabaseId;
use crate::core::MetricSample;
use crate::core::SnapshotRecord;
use crate::core::TagSet;
use crate::interfaces::TimeSeriesError;
use crate::interfaces::TimeSeriesStore;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Series key: database plus measurement name.
type SeriesKey = (DatabaseId, String);

/// Running count and sum for one group.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    /// Number of samples.
    count: u64,
    /// Sum of sample values.
    sum: f64,
}

impl Accumulator {
    /// Converts the accumulator into a row honoring the requested aggregates.
    #[allow(clippy::cast_precision_loss, reason = "Sample counts stay far below 2^52.")]
    fn into_row(self, tags: Option<TagSet>, query: &AggregateQuery) -> AggregateRow {
        AggregateRow {
            tags,
            count: query.kind.wants_count().then_some(self.count),
            mean: query.kind.wants_mean().then(|| self.sum / self.count as f64),
        }
    }
}

/// In-memory time-series store.
#[derive(Debug, Default)]
pub struct InMemoryTimeSeries {
    /// Metric samples per series.
    samples: Mutex<BTreeMap<SeriesKey, Vec<MetricSample>>>,
    /// Snapshot records per series, in insertion order.
    snapshots: Mutex<BTreeMap<SeriesKey, Vec<SnapshotRecord>>>,
    /// Number of read calls served.
    reads: AtomicUsize,
}

impl InMemoryTimeSeries {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a metric sample to `measurement`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSeriesError`] when the store lock is poisoned.
    pub fn record_sample(
        &self,
        measurement: &str,
        sample: MetricSample,
    ) -> Result<(), TimeSeriesError> {
        let mut guard = self.samples.lock().map_err(|_| poisoned())?;
        guard
            .entry((sample.database_id.clone(), measurement.to_string()))
            .or_default()
            .push(sample);
        Ok(())
    }

    /// Appends a snapshot record to `measurement`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSeriesError`] when the store lock is poisoned.
    pub fn record_snapshot(
        &self,
        database: &DatabaseId,
        measurement: &str,
        record: SnapshotRecord,
    ) -> Result<(), TimeSeriesError> {
        let mut guard = self.snapshots.lock().map_err(|_| poisoned())?;
        guard.entry((database.clone(), measurement.to_string())).or_default().push(record);
        Ok(())
    }

    /// Returns how many read calls the store has served.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Returns the snapshot records of a series ordered newest first.
    fn sorted_snapshots(
        &self,
        database: &DatabaseId,
        measurement: &str,
    ) -> Result<Vec<SnapshotRecord>, TimeSeriesError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.snapshots.lock().map_err(|_| poisoned())?;
        let mut records = guard
            .get(&(database.clone(), measurement.to_string()))
            .cloned()
            .unwrap_or_default();
        records.sort_by(|left, right| right.timestamp_ns.cmp(&left.timestamp_ns));
        Ok(records)
    }
}

impl TimeSeriesStore for InMemoryTimeSeries {
    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, TimeSeriesError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.samples.lock().map_err(|_| poisoned())?;
        let Some(series) = guard.get(&(query.database.clone(), query.measurement.clone())) else {
            return Ok(Vec::new());
        };
        let in_window = series.iter().filter(|sample| query.window.contains(sample.timestamp_ns));

        if query.group_by_tags {
            let mut groups: BTreeMap<TagSet, Accumulator> = BTreeMap::new();
            for sample in in_window {
                let entry = groups.entry(sample.tags.clone()).or_default();
                entry.count += 1;
                entry.sum += sample.value;
            }
            return Ok(groups
                .into_iter()
                .map(|(tags, acc)| acc.into_row(Some(tags), query))
                .collect());
        }

        let mut acc = Accumulator::default();
        for sample in in_window {
            acc.count += 1;
            acc.sum += sample.value;
        }
        if acc.count == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![acc.into_row(None, query)])
    }

    fn latest(
        &self,
        database: &DatabaseId,
        measurement: &str,
    ) -> Result<Option<SnapshotRecord>, TimeSeriesError> {
        Ok(self.sorted_snapshots(database, measurement)?.into_iter().next())
    }

    fn recent(
        &self,
        database: &DatabaseId,
        measurement: &str,
        limit: usize,
    ) -> Result<Vec<SnapshotRecord>, TimeSeriesError> {
        let mut records = self.sorted_snapshots(database, measurement)?;
        records.truncate(limit);
        Ok(records)
    }
}

/// Returns the lock poisoning error.
fn poisoned() -> TimeSeriesError {
    TimeSeriesError::Store("mutex poisoned".to_string())
}
