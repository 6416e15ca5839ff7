//! Recording fakes for tests of switchboards and providers.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::error::HostError;
use crate::host::HostCommands;
use crate::message::MessageSink;

/// A call received by [`RecordingHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// `open_undo_chunk(name)`.
    Open(String),
    /// `close_undo_chunk()`.
    Close,
    /// `execute(command)`.
    Execute(String),
}

/// Host façade that records every call.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingHost {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `execute(command)` fail from now on.
    pub fn fail_command(&self, command: impl Into<String>) {
        self.failing.lock().insert(command.into());
    }

    /// All recorded calls, in order.
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    /// Executed commands, in order.
    pub fn executed(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                HostEvent::Execute(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of opened undo chunks.
    pub fn open_count(&self) -> usize {
        self.count(|event| matches!(event, HostEvent::Open(_)))
    }

    /// Number of closed undo chunks.
    pub fn close_count(&self) -> usize {
        self.count(|event| matches!(event, HostEvent::Close))
    }

    fn count(&self, pred: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| pred(event)).count()
    }
}

impl HostCommands for RecordingHost {
    fn open_undo_chunk(&self, name: &str) {
        self.events.lock().push(HostEvent::Open(name.to_string()));
    }

    fn close_undo_chunk(&self) {
        self.events.lock().push(HostEvent::Close);
    }

    fn execute(&self, command: &str) -> Result<String, HostError> {
        self.events.lock().push(HostEvent::Execute(command.to_string()));
        if self.failing.lock().contains(command) {
            return Err(HostError::CommandFailed {
                command: command.to_string(),
                message: "rejected by test host".to_string(),
            });
        }
        Ok(String::new())
    }
}

/// Message sink that records every message.
#[derive(Debug, Default)]
pub struct RecordingMessages {
    messages: Mutex<Vec<String>>,
}

impl RecordingMessages {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl MessageSink for RecordingMessages {
    fn message_box(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }
}
