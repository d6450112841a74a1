// crates/cockpit-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example cockpit.toml.
// Purpose: Give operators a validated starting point for every section.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example covers a backend on one host with a co-located agent that
//! shares the `SQLite` counter file with the Fleet Manager's workers.

/// Returns a complete example configuration.
#[must_use]
pub const fn config_toml_example() -> &'static str {
    r#"# cockpit.toml
[gateway]
fleet_manager = "127.0.0.1:8001"
workload_generator = "127.0.0.1:8002"
request_timeout_ms = 5000
epoch_ms = 1000

[gateway.timeseries]
type = "influx"
url = "http://127.0.0.1:8086"
user = "admin"
password = "admin"
timeout_ms = 5000

[backend]
fleet_bind = "127.0.0.1:8001"
generator_bind = "127.0.0.1:8002"
data_root = "/var/lib/cockpit/data"
workloads_root = "/var/lib/cockpit/workloads"

[backend.driver]
type = "postgres"
connect_timeout_ms = 5000

[backend.counter]
type = "sqlite"
path = "/var/lib/cockpit/counters.sqlite3"

[agent]
bind = "127.0.0.1:8100"
database_id = "hyrise-1"
epoch_ms = 1000

[agent.database]
type = "postgres"
host = "127.0.0.1"
port = 5432
user = "postgres"
password = ""
dbname = "postgres"
max_connections = 4

[agent.counter]
type = "sqlite"
path = "/var/lib/cockpit/counters.sqlite3"

[audit]
enabled = true

[limits]
max_body_bytes = 1048576
"#
}
