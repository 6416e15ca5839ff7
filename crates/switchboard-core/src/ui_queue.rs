//! Deferred work for the UI thread.
//!
//! Background threads never touch widgets directly. They post closures to a
//! [`UiQueue`]; the host drains the queue from its UI thread (typically on an
//! idle callback) and the closures run there in posting order.

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

/// A type-erased unit of work to run on the UI thread.
pub struct QueuedInvocation {
    invoke: Box<dyn FnOnce() + Send>,
}

impl QueuedInvocation {
    /// Wrap a closure.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            invoke: Box::new(invoke),
        }
    }

    /// Run the invocation.
    pub fn execute(self) {
        (self.invoke)();
    }
}

/// Multi-producer queue drained on the UI thread.
#[derive(Clone)]
pub struct UiQueue {
    sender: Sender<QueuedInvocation>,
    receiver: Receiver<QueuedInvocation>,
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UiQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiQueue")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl UiQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A sender handle that can be moved to worker threads.
    pub fn poster(&self) -> UiPoster {
        UiPoster {
            sender: self.sender.clone(),
        }
    }

    /// Queue a closure.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The queue owns a receiver, so the channel is never disconnected.
        let _ = self.sender.send(QueuedInvocation::new(f));
    }

    /// Number of queued invocations.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run every queued invocation, including ones queued while draining.
    ///
    /// Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut count = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(invocation) => {
                    invocation.execute();
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if count > 0 {
            tracing::trace!(target: "switchboard_core::ui_queue", count, "drained ui queue");
        }
        count
    }
}

/// Cloneable, `Send` handle for posting to a [`UiQueue`].
#[derive(Clone, Debug)]
pub struct UiPoster {
    sender: Sender<QueuedInvocation>,
}

impl UiPoster {
    /// Queue a closure. Returns `false` if the queue was dropped.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(QueuedInvocation::new(f)).is_ok()
    }
}

static_assertions::assert_impl_all!(UiPoster: Send, Sync);
