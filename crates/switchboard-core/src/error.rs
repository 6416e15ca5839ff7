//! Error types for the Switchboard core.

use crate::widget::WidgetId;

/// Errors raised by widget tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// The widget ID is invalid or the widget has been destroyed.
    #[error("invalid or destroyed widget id {0:?}")]
    InvalidWidgetId(WidgetId),

    /// Attempted to parent a widget under itself or one of its descendants.
    #[error("cannot set a widget as its own parent or ancestor")]
    CircularParentage,

    /// Another widget in the same scope already carries this object name.
    #[error("object name '{name}' is already used in scope '{scope}'")]
    DuplicateName {
        /// Name of the enclosing panel or menu.
        scope: String,
        /// The conflicting object name.
        name: String,
    },

    /// A symbolic widget tag did not map to any known widget class.
    #[error("unknown widget tag '{0}'")]
    UnknownTag(String),
}

/// Result type for widget tree operations.
pub type WidgetResult<T> = std::result::Result<T, WidgetError>;
