// crates/cockpit-contract/src/schemas.rs
// ============================================================================
// Module: Response Schemas
// Description: JSON schema builders for every control command response.
// Purpose: Provide the canonical shape each response must have before use.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Every response schema pins `header.message` to the issued command and
//! requires an integer `header.status`. When the status is `200` the body
//! must match the command's success shape; otherwise the body may only carry
//! an optional `error` string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::commands::AgentCommand;
use crate::commands::FleetCommand;
use crate::commands::GeneratorCommand;

// ============================================================================
// SECTION: Public Schema Entrypoints
// ============================================================================

/// Returns the response schema of a Fleet Manager command.
#[must_use]
pub fn fleet_response_schema(command: FleetCommand) -> Value {
    let body = match command {
        FleetCommand::GetDatabases => json!({
            "type": "object",
            "required": ["databases"],
            "properties": {
                "databases": { "type": "array", "items": database_summary_schema() }
            }
        }),
        FleetCommand::QueueLength => json!({
            "type": "object",
            "required": ["queue_length"],
            "properties": {
                "queue_length": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id", "queue_length"],
                        "properties": {
                            "id": schema_for_string("Database identifier."),
                            "queue_length": schema_for_count("Pending tasks.")
                        }
                    }
                }
            }
        }),
        FleetCommand::Status => json!({
            "type": "object",
            "required": ["status"],
            "properties": {
                "status": { "type": "array", "items": instance_status_schema() }
            }
        }),
        FleetCommand::GetPlugins => json!({
            "type": "object",
            "required": ["plugins"],
            "properties": {
                "plugins": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id", "plugins"],
                        "properties": {
                            "id": schema_for_string("Database identifier."),
                            "plugins": schema_for_string_array("Active plugin names.")
                        }
                    }
                }
            }
        }),
        FleetCommand::GetPluginSetting => json!({
            "type": "object",
            "required": ["plugin_settings"],
            "properties": {
                "plugin_settings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id", "plugin_settings"],
                        "properties": {
                            "id": schema_for_string("Database identifier."),
                            "plugin_settings": {
                                "type": "array",
                                "items": plugin_setting_schema()
                            }
                        }
                    }
                }
            }
        }),
        FleetCommand::AddDatabase
        | FleetCommand::DeleteDatabase
        | FleetCommand::StartWorker
        | FleetCommand::CloseWorker
        | FleetCommand::ActivatePlugin
        | FleetCommand::DeactivatePlugin
        | FleetCommand::SetPluginSetting
        | FleetCommand::LoadData
        | FleetCommand::DeleteData => empty_body_schema(),
    };
    response_schema("fleet", command.wire_name(), &body)
}

/// Returns the response schema of a Workload Generator command.
#[must_use]
pub fn generator_response_schema(command: GeneratorCommand) -> Value {
    let body = match command {
        GeneratorCommand::StartWorkload | GeneratorCommand::StopWorkload => empty_body_schema(),
    };
    response_schema("generator", command.wire_name(), &body)
}

/// Returns the response schema of an Instance Agent command.
#[must_use]
pub fn agent_response_schema(command: AgentCommand) -> Value {
    let body = match command {
        AgentCommand::Query | AgentCommand::RuntimeInformation => empty_body_schema(),
        AgentCommand::Workload => json!({
            "type": "object",
            "required": ["executed"],
            "properties": { "executed": schema_for_count("Statements executed.") }
        }),
        AgentCommand::StorageData => json!({
            "type": "object",
            "required": ["storage"],
            "properties": { "storage": { "type": "object" } }
        }),
        AgentCommand::Throughput => json!({
            "type": "object",
            "required": ["throughput"],
            "properties": {
                "throughput": schema_for_count("Throughput of the last completed epoch.")
            }
        }),
    };
    response_schema("agent", command.wire_name(), &body)
}

/// Returns the envelope-only schema used for commands outside the catalog.
#[must_use]
pub fn envelope_schema(command: &str) -> Value {
    response_schema("any", command, &json!({ "type": "object" }))
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Wraps a success body schema into a full response schema.
fn response_schema(channel: &str, command: &str, success_body: &Value) -> Value {
    let slug = command.replace(' ', "_");
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": format!("cockpit://contract/responses/{channel}/{slug}.schema.json"),
        "title": format!("Cockpit {command} response"),
        "type": "object",
        "required": ["header", "body"],
        "properties": {
            "header": {
                "type": "object",
                "required": ["message", "status"],
                "properties": {
                    "message": { "const": command },
                    "status": { "type": "integer", "minimum": 100, "maximum": 599 }
                }
            },
            "body": { "type": "object" }
        },
        "if": {
            "properties": { "header": { "properties": { "status": { "const": 200 } } } }
        },
        "then": {
            "properties": { "body": success_body }
        },
        "else": {
            "properties": { "body": error_body_schema() }
        }
    })
}

/// Returns the schema of a body that carries no payload.
fn empty_body_schema() -> Value {
    json!({ "type": "object" })
}

/// Returns the schema of a failure body.
fn error_body_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "error": schema_for_string("Failure message.") }
    })
}

/// Returns the schema of a `get databases` listing entry.
fn database_summary_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "host", "port", "dbname", "number_workers", "worker_pool_status"],
        "properties": {
            "id": schema_for_string("Database identifier."),
            "host": schema_for_string("Host name or address."),
            "port": { "type": "integer", "minimum": 0, "maximum": 65535 },
            "dbname": schema_for_string("Database name."),
            "number_workers": schema_for_count("Worker pool size."),
            "worker_pool_status": worker_pool_status_schema()
        }
    })
}

/// Returns the schema of a `status` entry.
fn instance_status_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "id",
            "database_blocked_status",
            "worker_pool_status",
            "loaded_benchmarks",
            "loaded_tables"
        ],
        "properties": {
            "id": schema_for_string("Database identifier."),
            "database_blocked_status": { "type": "boolean" },
            "worker_pool_status": worker_pool_status_schema(),
            "loaded_benchmarks": schema_for_string_array("Fully loaded benchmarks."),
            "last_load_error": schema_for_string("Failure of the most recent data load."),
            "loaded_tables": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["table_name", "benchmark"],
                    "properties": {
                        "table_name": schema_for_string("Table name."),
                        "benchmark": schema_for_string("Benchmark name.")
                    }
                }
            }
        }
    })
}

/// Returns the schema of one plugin setting.
fn plugin_setting_schema() -> Value {
    json!({
        "type": "object",
        "required": ["plugin", "name", "value", "description"],
        "properties": {
            "plugin": schema_for_string("Plugin name."),
            "name": schema_for_string("Setting name."),
            "value": schema_for_string("Current value."),
            "description": schema_for_string("Setting description.")
        }
    })
}

/// Returns the schema of a worker pool status label.
fn worker_pool_status_schema() -> Value {
    json!({ "type": "string", "enum": ["running", "stopped", "blocked"] })
}

/// Returns a JSON schema for a plain string.
fn schema_for_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

/// Returns a JSON schema for non-negative integers.
fn schema_for_count(description: &str) -> Value {
    json!({
        "type": "integer",
        "minimum": 0,
        "description": description
    })
}

/// Returns a JSON schema for an array of strings.
fn schema_for_string_array(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description
    })
}
