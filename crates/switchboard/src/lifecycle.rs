//! Two-phase handler lifecycle bookkeeping.
//!
//! Each wired widget moves `Unbound → Initializing → Initialized → Armed`.
//! The `_init` constructor runs during `Initializing`, at most once; payloads
//! dispatched while it runs are parked and handed back when it finishes.

use std::collections::HashMap;

use parking_lot::Mutex;
use switchboard_core::{Payload, WidgetId};

/// Lifecycle phase of a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Never displayed nor invoked.
    Unbound,
    /// `_init` is running.
    Initializing,
    /// `_init` finished (or there was none); no handler has succeeded yet.
    Initialized,
    /// At least one handler invocation succeeded.
    Armed,
}

/// What the caller of [`Lifecycle::begin_init`] must do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InitStep {
    /// The caller owns initialization and must call `finish_init`.
    Run,
    /// Initialization already completed.
    Done,
    /// Another frame is initializing this widget.
    InProgress,
}

#[derive(Debug)]
enum Slot {
    Initializing { pending: Vec<Payload> },
    Initialized,
    Armed,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    slots: Mutex<HashMap<WidgetId, Slot>>,
}

impl Lifecycle {
    pub(crate) fn phase(&self, widget: WidgetId) -> LifecyclePhase {
        match self.slots.lock().get(&widget) {
            None => LifecyclePhase::Unbound,
            Some(Slot::Initializing { .. }) => LifecyclePhase::Initializing,
            Some(Slot::Initialized) => LifecyclePhase::Initialized,
            Some(Slot::Armed) => LifecyclePhase::Armed,
        }
    }

    pub(crate) fn begin_init(&self, widget: WidgetId) -> InitStep {
        let mut slots = self.slots.lock();
        match slots.get(&widget) {
            None => {
                slots.insert(widget, Slot::Initializing { pending: Vec::new() });
                InitStep::Run
            }
            Some(Slot::Initializing { .. }) => InitStep::InProgress,
            Some(_) => InitStep::Done,
        }
    }

    /// Park `payload` if the widget is initializing. Returns whether it was parked.
    pub(crate) fn defer(&self, widget: WidgetId, payload: &Payload) -> bool {
        match self.slots.lock().get_mut(&widget) {
            Some(Slot::Initializing { pending }) => {
                pending.push(payload.clone());
                true
            }
            _ => false,
        }
    }

    /// Complete initialization, returning the parked payloads in arrival order.
    pub(crate) fn finish_init(&self, widget: WidgetId) -> Vec<Payload> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(widget).or_insert(Slot::Initialized);
        match std::mem::replace(slot, Slot::Initialized) {
            Slot::Initializing { pending } => pending,
            Slot::Armed => {
                *slot = Slot::Armed;
                Vec::new()
            }
            Slot::Initialized => Vec::new(),
        }
    }

    pub(crate) fn mark_armed(&self, widget: WidgetId) {
        if let Some(slot) = self.slots.lock().get_mut(&widget) {
            if matches!(slot, Slot::Initialized) {
                *slot = Slot::Armed;
            }
        }
    }

    pub(crate) fn forget(&self, widget: WidgetId) {
        self.slots.lock().remove(&widget);
    }
}
