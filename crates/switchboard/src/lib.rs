//! Switchboard - widget dispatch, binding and synchronization for tool shelves.
//!
//! Panels of a shelf plugin are trees of widgets whose object names follow a
//! short convention (`tb000`, `chk003`, `s012`, `header`). The switchboard
//! resolves those names to handlers on a per-panel behavior provider, runs
//! each handler's lazy `_init` constructor exactly once, wraps undoable
//! handlers in one host undo chunk, and records successful invocations in a
//! capped command history. Synchronization rules keep sibling widgets and
//! widgets in different panels consistent.
//!
//! # Example
//!
//! ```
//! use switchboard::prelude::*;
//!
//! struct Edit;
//!
//! #[handlers]
//! impl Edit {
//!     /// Delete history
//!     fn b000(&self, call: &Call<'_>) -> HandlerResult {
//!         call.host().execute("delete -ch")?;
//!         Ok(())
//!     }
//! }
//!
//! let sb = Switchboard::new(SwitchboardConfig::default());
//! sb.register_provider("edit", None, |_| Ok(Edit));
//! sb.register_layout("edit", |menu| {
//!     menu.add(PushButton::new().object_name("b000").text("Delete history"))?;
//!     Ok(())
//! });
//!
//! sb.find_widget("edit", "b000").unwrap().click().unwrap();
//! assert_eq!(sb.history().last().unwrap().description, "Delete history");
//! ```

extern crate self as switchboard;

mod config;
mod context;
mod dispatch;
mod error;
mod history;
mod host;
mod lifecycle;
mod marking_menu;
pub mod menu;
mod message;
pub mod naming;
mod panel;
pub mod prelude;
mod provider;
mod registry;
pub mod sync;
pub mod testing;
mod transaction;

pub use switchboard_core::{Payload, SignalKind, WidgetClass, WidgetId, WidgetState, WidgetTree};
pub use switchboard_macros::handlers;

pub use config::{DispatchConfig, HistoryConfig, MarkingMenuConfig, SwitchboardConfig};
pub use context::{LayoutFn, Switchboard, SwitchboardBuilder};
pub use dispatch::DispatchOutcome;
pub use error::{
    ConfigError, HandlerError, HandlerResult, HostError, ProviderError, Result, SwitchboardError,
};
pub use history::{CommandHistory, HandlerRef, HistoryEntry, HistoryView};
pub use host::{HostCommands, NullHost};
pub use lifecycle::LifecyclePhase;
pub use marking_menu::MarkingMenu;
pub use menu::{Menu, WidgetConfig, WidgetHandle};
pub use message::{LogMessages, MessageSink};
pub use provider::{
    Call, HandlerFn, HandlerInfo, HandlerTable, Handlers, Layer, NoopProvider, PanelProvider,
    ProviderInstance, Resolved,
};
pub use registry::Registry;
pub use transaction::{TransactionGuard, TransactionManager};
