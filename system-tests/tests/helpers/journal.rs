// system-tests/tests/helpers/journal.rs
// ============================================================================
// Module: Call Journal
// Description: Channel wrapper recording every command across channels.
// Purpose: Assert cross-channel command order in workflow scenarios.
// Dependencies: cockpit-channel, cockpit-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use cockpit_channel::ChannelError;
use cockpit_channel::CommandChannel;
use cockpit_core::ControlMessage;

/// One issued command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Channel the command went out on.
    pub channel: String,
    /// Command name.
    pub command: String,
}

impl JournalEntry {
    pub fn new(channel: &str, command: &str) -> Self {
        Self {
            channel: channel.to_string(),
            command: command.to_string(),
        }
    }
}

/// Ordered log shared by every recording channel of one harness.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Entries recorded at or after position `mark`.
    pub fn since(&self, mark: usize) -> Vec<JournalEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(mark ..).map(<[JournalEntry]>::to_vec).unwrap_or_default()
    }

    /// Commands issued on `channel`, in order.
    pub fn commands_on(&self, channel: &str) -> Vec<String> {
        self.since(0)
            .into_iter()
            .filter(|entry| entry.channel == channel)
            .map(|entry| entry.command)
            .collect()
    }

    fn push(&self, entry: JournalEntry) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
    }
}

/// Forwards to a real channel after journaling the command.
pub struct RecordingChannel {
    inner: Arc<dyn CommandChannel>,
    journal: Journal,
}

impl RecordingChannel {
    pub fn new(inner: Arc<dyn CommandChannel>, journal: Journal) -> Self {
        Self {
            inner,
            journal,
        }
    }
}

impl CommandChannel for RecordingChannel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn send(&self, request: &ControlMessage) -> Result<ControlMessage, ChannelError> {
        self.journal.push(JournalEntry::new(self.inner.name(), request.command()));
        self.inner.send(request)
    }
}
