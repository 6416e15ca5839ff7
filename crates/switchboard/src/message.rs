//! User-facing message facility.

/// Presents short user-facing messages (handler failures, warnings).
pub trait MessageSink: Send + Sync {
    /// Show `text` to the user.
    fn message_box(&self, text: &str);
}

/// Writes messages to the log instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessages;

impl MessageSink for LogMessages {
    fn message_box(&self, text: &str) {
        tracing::warn!(target: "switchboard::dispatch", message = text, "message box");
    }
}
