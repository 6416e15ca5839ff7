//! Thread affinity checks for the UI thread.
//!
//! Every widget operation and every dispatch runs on the host's UI thread.
//! Worker threads that need to touch widgets go through
//! [`UiQueue`](crate::UiQueue) instead. A [`ThreadAffinity`] records the
//! thread a switchboard was created on and verifies later calls against it.
//!
//! ```
//! use switchboard_core::thread_check::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current(true);
//! assert!(affinity.is_same_thread());
//! affinity.verify("dispatch");
//! ```

use std::thread::ThreadId;

/// Records the thread an object belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
    enforce: bool,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current(cfg!(debug_assertions))
    }
}

impl ThreadAffinity {
    /// Bind to the current thread. When `enforce` is false, [`verify`](Self::verify)
    /// never panics.
    #[inline]
    pub fn current(enforce: bool) -> Self {
        Self {
            thread_id: std::thread::current().id(),
            enforce,
        }
    }

    /// The thread this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether violations panic.
    #[inline]
    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// Whether the calling thread is the bound thread.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Panic if enforcement is on and the calling thread is not the bound one.
    #[inline]
    pub fn verify(&self, operation: &str) {
        if self.enforce && !self.is_same_thread() {
            self.panic_wrong_thread(operation);
        }
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, operation: &str) -> ! {
        let current = std::thread::current();
        panic!(
            "THREAD AFFINITY VIOLATION: `{operation}` must run on the UI thread \
             ({:?}) but was called from \"{}\" ({:?}). \
             Post the work through UiQueue instead.",
            self.thread_id,
            current.name().unwrap_or("<unnamed>"),
            current.id(),
        )
    }
}
