//! Signal/slot system for Switchboard.
//!
//! Signals are emitted by widget nodes when their state changes; connected
//! slots (callbacks) run synchronously, in the emitting call stack.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal type for emitting notifications
//! - [`ConnectionId`] - Identifier returned when connecting a slot
//! - [`SignalBlocker`] - RAII guard that blocks a signal while alive
//!
//! # Re-entrancy
//!
//! Emission snapshots the connected slots before invoking them, so a slot may
//! connect, disconnect or emit (on this or any other signal) without
//! deadlocking. Slots connected during an emission are first called on the
//! next emission.
//!
//! # Example
//!
//! ```
//! use switchboard_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple like `(String, i32)` for multiple arguments.
pub struct Signal<Args> {
    /// All active connections, in connection order.
    connections: Mutex<SlotMap<ConnectionId, (u64, Slot<Args>)>>,
    /// Monotonic connection counter, used to keep emission order stable.
    next_order: AtomicU64,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            next_order: AtomicU64::new(0),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().insert((order, Arc::new(slot)))
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Returns the number of slots that ran (0 when blocked).
    #[tracing::instrument(skip_all, target = "switchboard_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: "switchboard_core::signal", "signal blocked, skipping emit");
            return 0;
        }

        let mut slots: Vec<(u64, Slot<Args>)> = self
            .connections
            .lock()
            .values()
            .map(|(order, slot)| (*order, Arc::clone(slot)))
            .collect();
        slots.sort_by_key(|(order, _)| *order);
        tracing::trace!(target: "switchboard_core::signal", connection_count = slots.len(), "emitting signal");

        for (_, slot) in &slots {
            slot(&args);
        }
        slots.len()
    }

    /// Block this signal until the returned guard is dropped.
    ///
    /// The previous blocked state is restored on drop, so blockers nest.
    pub fn blocker(&self) -> SignalBlocker<'_, Args> {
        let previous = self.blocked.swap(true, Ordering::SeqCst);
        SignalBlocker {
            signal: self,
            previous,
        }
    }
}

/// RAII guard returned by [`Signal::blocker`].
pub struct SignalBlocker<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    previous: bool,
}

impl<Args: 'static> Drop for SignalBlocker<'_, Args> {
    fn drop(&mut self) {
        self.signal.set_blocked(self.previous);
    }
}

static_assertions::assert_impl_all!(Signal<String>: Send, Sync);
