// crates/cockpit-contract/src/validator.rs
// ============================================================================
// Module: Response Validator
// Description: Compiled response schemas keyed by command wire name.
// Purpose: Reject malformed responses before any caller trusts them.
// Dependencies: jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ResponseValidator`] compiles the response schema of every command on
//! one channel up front. Commands outside the catalog are checked against the
//! envelope-only schema so even unrecognized-command replies are never
//! accepted unchecked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use crate::commands::AgentCommand;
use crate::commands::ChannelKind;
use crate::commands::FleetCommand;
use crate::commands::GeneratorCommand;
use crate::schemas::agent_response_schema;
use crate::schemas::envelope_schema;
use crate::schemas::fleet_response_schema;
use crate::schemas::generator_response_schema;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Contract validation errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum ContractError {
    /// A schema failed to compile.
    #[error("invalid schema: {0}")]
    Schema(String),
    /// A response does not match its command schema.
    #[error("response to `{command}` violates contract: {details}")]
    Violation {
        /// Command the response answered.
        command: String,
        /// Joined validation messages.
        details: String,
    },
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Compiled response schemas for one channel.
pub struct ResponseValidator {
    /// Channel the schemas belong to.
    channel: ChannelKind,
    /// Compiled schemas keyed by wire name.
    schemas: BTreeMap<&'static str, Validator>,
}

impl ResponseValidator {
    /// Compiles every response schema of `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Schema`] when a schema fails to compile.
    pub fn new(channel: ChannelKind) -> Result<Self, ContractError> {
        let sources: Vec<(&'static str, Value)> = match channel {
            ChannelKind::FleetManager => FleetCommand::ALL
                .into_iter()
                .map(|command| (command.wire_name(), fleet_response_schema(command)))
                .collect(),
            ChannelKind::WorkloadGenerator => GeneratorCommand::ALL
                .into_iter()
                .map(|command| (command.wire_name(), generator_response_schema(command)))
                .collect(),
            ChannelKind::InstanceAgent => AgentCommand::ALL
                .into_iter()
                .map(|command| (command.wire_name(), agent_response_schema(command)))
                .collect(),
        };
        let mut schemas = BTreeMap::new();
        for (name, schema) in sources {
            schemas.insert(name, compile_schema(&schema)?);
        }
        Ok(Self {
            channel,
            schemas,
        })
    }

    /// Returns the channel the validator was built for.
    #[must_use]
    pub const fn channel(&self) -> ChannelKind {
        self.channel
    }

    /// Returns true when `command` belongs to the channel's catalog.
    #[must_use]
    pub fn knows(&self, command: &str) -> bool {
        self.schemas.contains_key(command)
    }

    /// Validates a raw response to `command`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Violation`] when the response does not match.
    pub fn validate(&self, command: &str, response: &Value) -> Result<(), ContractError> {
        let messages: Vec<String> = if let Some(schema) = self.schemas.get(command) {
            schema.iter_errors(response).map(|err| err.to_string()).collect()
        } else {
            let schema = compile_schema(&envelope_schema(command))?;
            schema.iter_errors(response).map(|err| err.to_string()).collect()
        };
        if messages.is_empty() {
            return Ok(());
        }
        Err(ContractError::Violation {
            command: command.to_string(),
            details: messages.join("; "),
        })
    }
}

/// Compiles a JSON schema against draft 2020-12.
fn compile_schema(schema: &Value) -> Result<Validator, ContractError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| ContractError::Schema(err.to_string()))
}
