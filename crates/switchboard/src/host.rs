//! The host-application command façade.
//!
//! The switchboard never talks to the host application itself; it only needs
//! undo chunks. Providers execute their commands through the same façade.

use crate::error::HostError;

/// Commands the switchboard and providers issue to the host application.
pub trait HostCommands: Send + Sync {
    /// Begin grouping edits into one undoable step.
    fn open_undo_chunk(&self, name: &str);

    /// Close the undo step opened by [`open_undo_chunk`](Self::open_undo_chunk).
    fn close_undo_chunk(&self);

    /// Execute a host command, returning its textual result.
    fn execute(&self, command: &str) -> Result<String, HostError>;
}

/// A host that accepts everything and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl HostCommands for NullHost {
    fn open_undo_chunk(&self, name: &str) {
        tracing::trace!(target: "switchboard::transaction", name, "null host: open undo chunk");
    }

    fn close_undo_chunk(&self) {
        tracing::trace!(target: "switchboard::transaction", "null host: close undo chunk");
    }

    fn execute(&self, command: &str) -> Result<String, HostError> {
        tracing::trace!(target: "switchboard::dispatch", command, "null host: execute");
        Ok(String::new())
    }
}
