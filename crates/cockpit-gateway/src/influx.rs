// crates/cockpit-gateway/src/influx.rs
// ============================================================================
// Module: InfluxDB Time-Series Reader
// Description: TimeSeriesStore over the InfluxDB 1.x HTTP query API.
// Purpose: Serve windowed aggregates and latest records to the aggregator.
// Dependencies: cockpit-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Each database id maps to an `InfluxDB` database of the same name. Window
//! bounds are bound as `$startts`/`$endts` parameters rather than spliced
//! into the statement, and timestamps are requested in nanoseconds.
//! Responses are read with a hard size limit. Redirects are not followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use cockpit_core::AggregateQuery;
use cockpit_core::AggregateRow;
use cockpit_core::DatabaseId;
use cockpit_core::SnapshotRecord;
use cockpit_core::TagSet;
use cockpit_core::TimeSeriesError;
use cockpit_core::TimeSeriesStore;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default response size limit.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

/// Connection settings for an `InfluxDB` server.
#[derive(Clone)]
pub struct InfluxSettings {
    /// Server root URL.
    pub url: String,
    /// Optional user name.
    pub user: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Response size limit.
    pub max_response_bytes: usize,
}

impl InfluxSettings {
    /// Creates settings for an unauthenticated server.
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            timeout,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Sets credentials.
    #[must_use]
    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user;
        self.password = password;
        self
    }
}

impl std::fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Top-level query response.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    /// Per-statement results.
    #[serde(default)]
    results: Vec<StatementResult>,
    /// Request-level error.
    #[serde(default)]
    error: Option<String>,
}

/// Result of one statement.
#[derive(Debug, Deserialize)]
struct StatementResult {
    /// Returned series; absent when nothing matched.
    #[serde(default)]
    series: Vec<Series>,
    /// Statement-level error.
    #[serde(default)]
    error: Option<String>,
}

/// One series of rows sharing a tag set.
#[derive(Debug, Deserialize)]
struct Series {
    /// Group tags.
    #[serde(default)]
    tags: Option<Map<String, Value>>,
    /// Column names.
    columns: Vec<String>,
    /// Rows in column order.
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl Series {
    /// Returns the rows as column-keyed maps.
    fn records(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        self.values
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `InfluxDB` 1.x time-series reader.
pub struct InfluxTimeSeries {
    /// HTTP client with timeout and no redirects.
    client: Client,
    /// `/query` endpoint.
    endpoint: Url,
    /// Connection settings.
    settings: InfluxSettings,
}

impl InfluxTimeSeries {
    /// Creates a reader.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSeriesError::Transport`] when the URL or client is invalid.
    pub fn new(settings: InfluxSettings) -> Result<Self, TimeSeriesError> {
        let base = Url::parse(&settings.url)
            .map_err(|err| TimeSeriesError::Transport(format!("invalid influx url: {err}")))?;
        let endpoint = base
            .join("query")
            .map_err(|err| TimeSeriesError::Transport(format!("invalid influx url: {err}")))?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|_| TimeSeriesError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            client,
            endpoint,
            settings,
        })
    }

    /// Runs one statement against `database` and returns its series.
    fn query(
        &self,
        database: &DatabaseId,
        statement: &str,
        params: Option<&Value>,
    ) -> Result<Vec<Series>, TimeSeriesError> {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("db", database.as_str());
            pairs.append_pair("q", statement);
            pairs.append_pair("epoch", "ns");
            if let Some(params) = params {
                pairs.append_pair("params", &params.to_string());
            }
        }
        let mut request = self.client.get(url);
        if let Some(user) = &self.settings.user {
            request = request.basic_auth(user, self.settings.password.as_deref());
        }
        let mut response = request
            .send()
            .map_err(|err| TimeSeriesError::Transport(format!("influx request failed: {err}")))?;
        let status = response.status();
        let body = read_response_limited(&mut response, self.settings.max_response_bytes)?;
        let parsed: QueryResponse = serde_json::from_slice(&body).map_err(|err| {
            if status.is_success() {
                TimeSeriesError::Invalid(err.to_string())
            } else {
                TimeSeriesError::Store(format!("influx returned status {}", status.as_u16()))
            }
        })?;
        if let Some(error) = parsed.error {
            return Err(TimeSeriesError::Store(error));
        }
        if !status.is_success() {
            return Err(TimeSeriesError::Store(format!(
                "influx returned status {}",
                status.as_u16()
            )));
        }
        let mut series = Vec::new();
        for result in parsed.results {
            if let Some(error) = result.error {
                return Err(TimeSeriesError::Store(error));
            }
            series.extend(result.series);
        }
        Ok(series)
    }

    /// Reads up to `limit` records of a measurement, newest first.
    fn records(
        &self,
        database: &DatabaseId,
        measurement: &str,
        limit: usize,
    ) -> Result<Vec<SnapshotRecord>, TimeSeriesError> {
        let statement = format!(
            "SELECT * FROM {} ORDER BY time DESC LIMIT {limit}",
            quote_identifier(measurement)
        );
        let mut records = Vec::new();
        for series in self.query(database, &statement, None)? {
            for mut fields in series.records() {
                let timestamp_ns = fields
                    .remove("time")
                    .and_then(|time| time.as_i64())
                    .ok_or_else(|| TimeSeriesError::Invalid("record without time".to_string()))?;
                records.push(SnapshotRecord {
                    timestamp_ns,
                    fields,
                });
            }
        }
        Ok(records)
    }
}

impl TimeSeriesStore for InfluxTimeSeries {
    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, TimeSeriesError> {
        let params = json!({
            "startts": query.window.start_ns,
            "endts": query.window.end_ns,
        });
        let series = self.query(&query.database, &aggregate_statement(query), Some(&params))?;
        let mut rows = Vec::new();
        for entry in &series {
            let tags = if query.group_by_tags { Some(tag_set(entry)?) } else { None };
            for record in entry.records() {
                rows.push(AggregateRow {
                    tags: tags.clone(),
                    count: if query.kind.wants_count() {
                        Some(record.get("count").and_then(Value::as_u64).unwrap_or(0))
                    } else {
                        None
                    },
                    mean: if query.kind.wants_mean() {
                        record.get("mean").and_then(Value::as_f64)
                    } else {
                        None
                    },
                });
            }
        }
        Ok(rows)
    }

    fn latest(
        &self,
        database: &DatabaseId,
        measurement: &str,
    ) -> Result<Option<SnapshotRecord>, TimeSeriesError> {
        Ok(self.records(database, measurement, 1)?.into_iter().next())
    }

    fn recent(
        &self,
        database: &DatabaseId,
        measurement: &str,
        limit: usize,
    ) -> Result<Vec<SnapshotRecord>, TimeSeriesError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.records(database, measurement, limit)
    }
}

// ============================================================================
// SECTION: Statements
// ============================================================================

/// Builds the windowed count/mean statement for an aggregate query.
#[must_use]
pub fn aggregate_statement(query: &AggregateQuery) -> String {
    let field = quote_identifier(&query.field);
    let mut selections = Vec::new();
    if query.kind.wants_count() {
        selections.push(format!("COUNT({field}) AS \"count\""));
    }
    if query.kind.wants_mean() {
        selections.push(format!("MEAN({field}) AS \"mean\""));
    }
    let mut statement = format!(
        "SELECT {} FROM {} WHERE time > $startts AND time <= $endts",
        selections.join(", "),
        quote_identifier(&query.measurement),
    );
    if query.group_by_tags {
        statement.push_str(" GROUP BY \"benchmark\", \"query_no\"");
    }
    statement
}

/// Quotes an identifier for `InfluxQL`.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Extracts the `(benchmark, query_no)` tags of a grouped series.
fn tag_set(series: &Series) -> Result<TagSet, TimeSeriesError> {
    let tags = series
        .tags
        .as_ref()
        .ok_or_else(|| TimeSeriesError::Invalid("grouped series without tags".to_string()))?;
    let tag = |name: &str| {
        tags.get(name)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| TimeSeriesError::Invalid(format!("series tag `{name}` missing")))
    };
    Ok(TagSet {
        benchmark: tag("benchmark")?,
        query_no: tag("query_no")?,
    })
}

// ============================================================================
// SECTION: Transport Helpers
// ============================================================================

/// Reads a response body, failing when it exceeds `max_bytes`.
fn read_response_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, TimeSeriesError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| TimeSeriesError::Transport("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(TimeSeriesError::Transport("influx response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| TimeSeriesError::Transport("failed to read influx response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(TimeSeriesError::Transport("influx response exceeds size limit".to_string()));
    }
    Ok(buf)
}
