//! Error types for the Switchboard engine.

use std::path::PathBuf;

use switchboard_core::WidgetError;

/// Errors raised by switchboard operations.
#[derive(Debug, thiserror::Error)]
pub enum SwitchboardError {
    /// No layout was registered for the panel.
    #[error("unknown panel '{0}'")]
    UnknownPanel(String),

    /// No widget with this name exists in the searched scope.
    #[error("no widget named '{name}' in '{scope}'")]
    UnknownWidget {
        /// Name of the searched panel or menu.
        scope: String,
        /// The requested widget name.
        name: String,
    },

    /// A widget range expression could not be expanded.
    #[error("invalid widget range '{0}'")]
    InvalidRange(String),

    /// The widget does not belong to any panel.
    #[error("widget '{0}' is not inside a panel")]
    NotInPanel(String),

    /// A signal name is not recognized.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    /// A synchronization action name is not recognized.
    #[error("unknown synchronization action '{0}'")]
    InvalidAction(String),

    /// A widget tree operation failed.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for switchboard operations.
pub type Result<T> = std::result::Result<T, SwitchboardError>;

/// Errors raised by behavior-provider constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider's host-application binding is not available.
    #[error("host binding unavailable: {0}")]
    HostUnavailable(String),

    /// Any other construction failure.
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the host-application command façade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// A host command ran and reported a failure.
    #[error("command '{command}' failed: {message}")]
    CommandFailed {
        /// The command that was executed.
        command: String,
        /// The host's failure message.
        message: String,
    },

    /// The host application cannot execute commands right now.
    #[error("host application unavailable")]
    Unavailable,
}

/// Errors returned by `_init` and invoke handlers.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A user-facing failure message.
    #[error("{0}")]
    Message(String),

    /// A host command failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// A widget operation failed.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// A switchboard operation failed.
    #[error(transparent)]
    Switchboard(#[from] SwitchboardError),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Create a message error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Result type returned by handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration value for '{key}': {message}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}
