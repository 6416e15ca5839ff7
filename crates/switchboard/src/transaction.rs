//! Undo transactions.
//!
//! [`TransactionManager::as_transaction`] opens a host undo chunk, runs a
//! closure and closes the chunk on every exit path, panics included. Nested
//! transactions collapse into the outermost chunk: only the 0→1 depth
//! transition opens and only 1→0 closes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::host::HostCommands;

/// Reference-counted undo-chunk wrapper around a host.
pub struct TransactionManager {
    host: Arc<dyn HostCommands>,
    depth: AtomicUsize,
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("depth", &self.depth())
            .finish()
    }
}

impl TransactionManager {
    /// Create a manager issuing undo chunks to `host`.
    pub fn new(host: Arc<dyn HostCommands>) -> Self {
        Self {
            host,
            depth: AtomicUsize::new(0),
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Whether an undo chunk is open.
    pub fn is_open(&self) -> bool {
        self.depth() > 0
    }

    /// Enter a transaction; it ends when the guard drops.
    pub fn begin(&self, name: &str) -> TransactionGuard<'_> {
        if self.depth.fetch_add(1, Ordering::SeqCst) == 0 {
            tracing::debug!(target: "switchboard::transaction", name, "opening undo chunk");
            self.host.open_undo_chunk(name);
        } else {
            tracing::trace!(target: "switchboard::transaction", name, depth = self.depth(), "nested transaction");
        }
        TransactionGuard { manager: self }
    }

    /// Run `f` inside a transaction and return its result unchanged.
    ///
    /// Errors returned by `f` and panics raised in it propagate after the
    /// chunk is closed.
    pub fn as_transaction<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let _guard = self.begin(name);
        f()
    }
}

/// Keeps a transaction open while alive.
#[must_use = "the transaction ends when the guard is dropped"]
pub struct TransactionGuard<'a> {
    manager: &'a TransactionManager,
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.manager.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            tracing::debug!(target: "switchboard::transaction", "closing undo chunk");
            self.manager.host.close_undo_chunk();
        }
    }
}
