//! Cross-widget synchronization and grouping.
//!
//! - [`ToggleMulti`]: a trigger widget's state drives enable/check/visibility
//!   actions on named sibling widgets.
//! - [`ButtonGroup`]: mutually exclusive checkable widgets.
//! - [`SyncLink`]: one attribute mirrored between two widgets.
//!
//! Every primitive guards its own writes with an applying flag, so the
//! signals its actions emit never feed back into it.

mod button_group;
mod link;
mod range;
mod toggle;

use std::sync::atomic::{AtomicBool, Ordering};

pub use button_group::{ButtonGroup, create_button_groups};
pub use link::{SyncAttr, SyncLink};
pub use range::{MAX_RANGE_SPAN, expand_range};
pub use toggle::{SyncAction, ToggleMulti, ToggleRule};

/// Holds an applying flag set for its lifetime.
pub(crate) struct ApplyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ApplyGuard<'a> {
    /// Set the flag; `None` when it was already set (re-entrant emission).
    pub(crate) fn enter(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
