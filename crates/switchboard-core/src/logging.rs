//! Logging and debugging facilities for Switchboard.
//!
//! This module provides:
//! - Target names for filtering Switchboard's `tracing` output
//! - Debug visualization for widget trees
//! - Performance tracing hooks for profiling
//!
//! Switchboard never installs a subscriber. To see logs, the host plugin
//! installs one:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("switchboard=debug,switchboard_core=info")
//!     .init();
//! ```
//!
//! Use [`WidgetTreeDebug`] to dump a panel hierarchy:
//!
//! ```ignore
//! use switchboard_core::logging::WidgetTreeDebug;
//!
//! println!("{}", WidgetTreeDebug::new().format_subtree(&tree, panel)?);
//! ```

use std::fmt::Write as FmtWrite;

use crate::error::WidgetResult;
use crate::widget::{WidgetId, WidgetTree};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "switchboard_core";
    /// Widget tree target.
    pub const WIDGET: &str = "switchboard_core::widget";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "switchboard_core::signal";
    /// Engine crate target.
    pub const ENGINE: &str = "switchboard";
    /// Provider registry target.
    pub const REGISTRY: &str = "switchboard::registry";
    /// Signal dispatch target.
    pub const DISPATCH: &str = "switchboard::dispatch";
    /// Widget synchronization target.
    pub const SYNC: &str = "switchboard::sync";
    /// Command history target.
    pub const HISTORY: &str = "switchboard::history";
    /// Undo transaction target.
    pub const TRANSACTION: &str = "switchboard::transaction";
    /// Marking menu target.
    pub const MARKING_MENU: &str = "switchboard::marking_menu";
}

/// Style options for widget tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for widget tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show widget IDs.
    pub show_ids: bool,
    /// Whether to show widget classes.
    pub show_classes: bool,
    /// Whether to show enabled/checked/value state.
    pub show_state: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_classes: true,
            show_state: false,
            max_depth: None,
        }
    }
}

impl TreeFormatOptions {
    /// Options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_ids: true,
            show_state: true,
            ..Default::default()
        }
    }
}

/// Debug utility for visualizing widget trees.
#[derive(Debug, Clone, Default)]
pub struct WidgetTreeDebug {
    options: TreeFormatOptions,
}

impl WidgetTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every root of the tree.
    pub fn format_all(&self, tree: &WidgetTree) -> WidgetResult<String> {
        let roots = tree.roots();
        let mut output = String::new();
        let _ = writeln!(output, "Widget Tree ({} total widgets):", tree.node_count());
        if roots.is_empty() {
            output.push_str("  (empty)\n");
        }
        for root in roots {
            self.format_into(tree, root, 0, "", true, &mut output)?;
        }
        Ok(output)
    }

    /// Format the subtree rooted at `root`.
    pub fn format_subtree(&self, tree: &WidgetTree, root: WidgetId) -> WidgetResult<String> {
        let mut output = String::new();
        self.format_into(tree, root, 0, "", true, &mut output)?;
        Ok(output)
    }

    fn format_into(
        &self,
        tree: &WidgetTree,
        id: WidgetId,
        depth: usize,
        indent: &str,
        is_last: bool,
        output: &mut String,
    ) -> WidgetResult<()> {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let (tee, corner, bar) = match self.options.style {
            TreeStyle::Ascii => ("+-- ", "`-- ", "|   "),
            TreeStyle::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} ", "\u{2502}   "),
        };

        output.push_str(indent);
        if depth > 0 {
            output.push_str(if is_last { corner } else { tee });
        }

        let name = tree.name(id)?;
        output.push_str(if name.is_empty() { "(unnamed)" } else { &name });
        if self.options.show_classes {
            let _ = write!(output, " ({})", tree.class(id)?);
        }
        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", id);
        }
        if self.options.show_state {
            let state = tree.state(id)?;
            let _ = write!(
                output,
                " {{enabled={}, checked={}, value={}, index={}}}",
                state.enabled, state.checked, state.value, state.index
            );
        }
        output.push('\n');

        let child_indent = if depth == 0 {
            String::new()
        } else {
            format!("{indent}{}", if is_last { "    " } else { bar })
        };
        let children = tree.children(id)?;
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_into(tree, child, depth + 1, &child_indent, i + 1 == count, output)?;
        }
        Ok(())
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of dispatches and panel construction.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "switchboard::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

/// Wrappers around the `tracing` macros with Switchboard's default target.
#[macro_export]
macro_rules! sb_trace {
    ($($arg:tt)*) => {
        $crate::tracing::trace!(target: "switchboard", $($arg)*)
    };
}

#[macro_export]
macro_rules! sb_debug {
    ($($arg:tt)*) => {
        $crate::tracing::debug!(target: "switchboard", $($arg)*)
    };
}

#[macro_export]
macro_rules! sb_info {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "switchboard", $($arg)*)
    };
}

#[macro_export]
macro_rules! sb_warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!(target: "switchboard", $($arg)*)
    };
}

#[macro_export]
macro_rules! sb_error {
    ($($arg:tt)*) => {
        $crate::tracing::error!(target: "switchboard", $($arg)*)
    };
}
