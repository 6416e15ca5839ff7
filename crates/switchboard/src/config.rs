//! Switchboard configuration.
//!
//! Loaded from TOML; every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```
//! use switchboard::SwitchboardConfig;
//!
//! let config = SwitchboardConfig::from_toml_str(r#"
//! host_app = "maya"
//!
//! [history]
//! capacity = 50
//! "#).unwrap();
//! assert_eq!(config.host_app, "maya");
//! assert_eq!(config.history.capacity, 50);
//! assert!(config.marking_menu.hide_on_release);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration handed to [`Switchboard::new`](crate::Switchboard::new).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    /// The active host-application variant.
    pub host_app: String,
    /// Command history settings.
    pub history: HistoryConfig,
    /// Marking menu settings.
    pub marking_menu: MarkingMenuConfig,
    /// Dispatch settings.
    pub dispatch: DispatchConfig,
    /// Panic on UI-thread violations instead of only logging them.
    pub thread_checks: bool,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            host_app: "base".to_string(),
            history: HistoryConfig::default(),
            marking_menu: MarkingMenuConfig::default(),
            dispatch: DispatchConfig::default(),
            thread_checks: cfg!(debug_assertions),
        }
    }
}

/// Command history settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept; at least 1.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

/// Marking menu settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkingMenuConfig {
    /// Panel shown on key press.
    pub start_panel: String,
    /// Hide when the key is released (unless pinned).
    pub hide_on_release: bool,
    /// Number of entries in the recent commands list.
    pub recent_commands: usize,
}

impl Default for MarkingMenuConfig {
    fn default() -> Self {
        Self {
            start_panel: "main".to_string(),
            hide_on_release: true,
            recent_commands: 10,
        }
    }
}

/// Dispatch settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Catch panics raised by handlers and report them like errors.
    pub catch_panics: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { catch_panics: true }
    }
}

impl SwitchboardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(target: "switchboard", path = %path.display(), host_app = %config.host_app, "loaded configuration");
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "history.capacity",
                message: "must be at least 1".to_string(),
            });
        }
        if self.host_app.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "host_app",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Builder-style host application override.
    pub fn with_host_app(mut self, host_app: impl Into<String>) -> Self {
        self.host_app = host_app.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(
            SwitchboardConfig::from_toml_str("").unwrap(),
            SwitchboardConfig::default()
        );
    }

    #[test]
    fn test_partial_sections() {
        let config = SwitchboardConfig::from_toml_str(
            r#"
            [marking_menu]
            start_panel = "hotbox"
            hide_on_release = false

            [dispatch]
            catch_panics = false
            "#,
        )
        .unwrap();
        assert_eq!(config.marking_menu.start_panel, "hotbox");
        assert!(!config.marking_menu.hide_on_release);
        assert_eq!(config.marking_menu.recent_commands, 10);
        assert!(!config.dispatch.catch_panics);
        assert_eq!(config.history.capacity, 20);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = SwitchboardConfig::from_toml_str("[history]\ncapacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "history.capacity", .. }));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = SwitchboardConfig::from_toml_str("host_app = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SwitchboardConfig::load("/nonexistent/switchboard.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SwitchboardConfig::default().with_host_app("blender");
        let text = config.to_toml_string().unwrap();
        assert_eq!(SwitchboardConfig::from_toml_str(&text).unwrap(), config);
    }
}
