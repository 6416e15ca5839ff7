//! Everything a behavior provider or panel layout usually needs.
//!
//! ```
//! use switchboard::prelude::*;
//! ```

pub use crate::config::SwitchboardConfig;
pub use crate::context::Switchboard;
pub use crate::dispatch::DispatchOutcome;
pub use crate::error::{HandlerError, HandlerResult, SwitchboardError};
pub use crate::menu::{
    CheckBox, ComboBox, DoubleSpinBox, Generic, Label, LineEdit, ListWidget, Menu, PushButton,
    RadioButton, Separator, SpinBox, ToolButton, WidgetHandle,
};
pub use crate::provider::{Call, Handlers};
pub use crate::sync::{SyncAttr, ToggleMulti};
pub use switchboard_core::{Payload, SignalKind, WidgetClass, WidgetId};
pub use switchboard_macros::handlers;
