// crates/cockpit-gateway/tests/common/mod.rs
// ============================================================================
// Module: Gateway Test Fixtures
// Description: Scripted control channels that record every call.
// Purpose: Drive clients, workflows, and the aggregator without servers.
// Dependencies: cockpit-channel, cockpit-core
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Shared fixtures are not used by every test binary."
)]

use std::collections::HashMap;
use std::sync::Mutex;

use cockpit_channel::ChannelError;
use cockpit_channel::CommandChannel;
use cockpit_channel::UnavailableKind;
use cockpit_core::ControlMessage;
use cockpit_core::StatusCode;
use cockpit_core::empty_body;
use serde_json::Value;
use serde_json::json;

/// Scripted outcome of one command.
#[derive(Clone)]
pub enum Reply {
    Success(Value),
    Failure(StatusCode, Option<String>),
    Unavailable,
    Violation,
}

/// Channel mock: answers from a script and records issued commands in order.
pub struct ScriptedChannel {
    name: String,
    script: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, command: &str, reply: Reply) -> Self {
        self.script.lock().unwrap().insert(command.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == command).count()
    }
}

impl CommandChannel for ScriptedChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, request: &ControlMessage) -> Result<ControlMessage, ChannelError> {
        let command = request.command().to_string();
        self.calls.lock().unwrap().push(command.clone());
        let reply = self
            .script
            .lock()
            .unwrap()
            .get(&command)
            .cloned()
            .unwrap_or(Reply::Success(empty_body()));
        match reply {
            Reply::Success(body) => Ok(ControlMessage::success(command, body)),
            Reply::Failure(status, Some(message)) => {
                Ok(ControlMessage::failure(command, status, message))
            }
            Reply::Failure(status, None) => {
                Ok(ControlMessage::reply(command, status, empty_body()))
            }
            Reply::Unavailable => Err(ChannelError::Unavailable {
                kind: UnavailableKind::Timeout,
                detail: "no reply within 5000 ms".to_string(),
            }),
            Reply::Violation => Err(ChannelError::ProtocolViolation(format!(
                "`{command}` reply is missing a required field"
            ))),
        }
    }
}

/// `get databases` body listing `ids`.
pub fn databases_body(ids: &[&str]) -> Value {
    let databases: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "host": "localhost",
                "port": 5432,
                "dbname": id,
                "number_workers": 4,
                "worker_pool_status": "running",
            })
        })
        .collect();
    json!({ "databases": databases })
}
