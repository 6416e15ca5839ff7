//! Core systems for Switchboard.
//!
//! This crate provides the toolkit-side foundation the dispatch engine runs on:
//!
//! - **Widget Tree**: Arena of widget nodes with scoped object names
//! - **Signal/Slot System**: Synchronous, re-entrant signals
//! - **Thread Affinity**: UI-thread verification
//! - **UI Queue**: Deferred work posted from worker threads
//! - **Logging**: `tracing` targets, tree dumps and perf spans
//!
//! # Example
//!
//! ```
//! use switchboard_core::{Payload, WidgetClass, WidgetTree};
//!
//! let tree = WidgetTree::new();
//! let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
//! let check = tree.insert(Some(panel), WidgetClass::CheckBox, "chk000").unwrap();
//!
//! tree.signals(check).unwrap().toggled.connect(|payload| {
//!     assert_eq!(*payload, Payload::Bool(true));
//! });
//! tree.set_checked(check, true).unwrap();
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod thread_check;
mod ui_queue;
pub mod widget;

#[doc(hidden)]
pub use tracing;

pub use error::{WidgetError, WidgetResult};
pub use logging::{PerfSpan, TreeFormatOptions, TreeStyle, WidgetTreeDebug};
pub use signal::{ConnectionId, Signal, SignalBlocker};
pub use thread_check::ThreadAffinity;
pub use ui_queue::{QueuedInvocation, UiPoster, UiQueue};
pub use widget::{
    Limits, MenuSlot, Payload, SignalKind, WidgetClass, WidgetId, WidgetSignals, WidgetState,
    WidgetTree,
};
