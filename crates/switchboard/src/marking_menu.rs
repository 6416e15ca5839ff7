//! Marking-menu controller.
//!
//! The marking menu (hotbox) is a popup of panels bound to a key. Pressing
//! the key shows the start panel; buttons inside can navigate to other
//! panels, which are stacked so [`MarkingMenu::back`] returns to the
//! previous one. Releasing the key hides the menu unless it was pinned.
//!
//! The controller holds no widget state of its own: panels are built
//! through the [`Switchboard`] on first show and handlers run through its
//! dispatcher.

use std::sync::Arc;

use parking_lot::Mutex;
use switchboard_core::{Payload, WidgetId};

use crate::context::Switchboard;
use crate::dispatch::DispatchOutcome;
use crate::error::Result;
use crate::menu::{Menu, WidgetHandle};

#[derive(Debug, Default)]
struct NavState {
    stack: Vec<String>,
    visible: bool,
    pinned: bool,
}

/// Navigation, visibility and pinning of the marking menu.
#[derive(Debug)]
pub struct MarkingMenu {
    switchboard: Arc<Switchboard>,
    state: Mutex<NavState>,
}

impl MarkingMenu {
    /// Create a hidden marking menu over `switchboard`'s panels.
    pub fn new(switchboard: Arc<Switchboard>) -> Self {
        Self {
            switchboard,
            state: Mutex::new(NavState::default()),
        }
    }

    /// The key went down: reset navigation and show the start panel.
    pub fn key_press(&self) -> Result<Menu> {
        let start = self.switchboard.config().marking_menu.start_panel.clone();
        let menu = self.switchboard.panel(&start)?;
        let mut state = self.state.lock();
        state.stack.clear();
        state.stack.push(start);
        state.visible = true;
        tracing::debug!(target: "switchboard::marking_menu", panel = %state.stack[0], "shown");
        Ok(menu)
    }

    /// The key went up. Returns whether the menu was hidden.
    pub fn key_release(&self) -> bool {
        let hide_on_release = self.switchboard.config().marking_menu.hide_on_release;
        let mut state = self.state.lock();
        if !state.visible || state.pinned || !hide_on_release {
            return false;
        }
        state.visible = false;
        tracing::debug!(target: "switchboard::marking_menu", "hidden on release");
        true
    }

    /// Navigate to `panel`, building it if needed.
    pub fn show(&self, panel: &str) -> Result<Menu> {
        let menu = self.switchboard.panel(panel)?;
        let mut state = self.state.lock();
        if state.stack.last().map(String::as_str) != Some(panel) {
            state.stack.push(panel.to_string());
        }
        state.visible = true;
        tracing::debug!(target: "switchboard::marking_menu", panel, depth = state.stack.len(), "navigated");
        Ok(menu)
    }

    /// Return to the previous panel. Returns its name, or `None` at the
    /// start panel.
    pub fn back(&self) -> Option<String> {
        let mut state = self.state.lock();
        if state.stack.len() < 2 {
            return None;
        }
        state.stack.pop();
        state.stack.last().cloned()
    }

    /// Hide regardless of pinning.
    pub fn hide(&self) {
        let mut state = self.state.lock();
        state.visible = false;
        state.pinned = false;
    }

    /// The panel on top of the navigation stack.
    pub fn current(&self) -> Option<String> {
        self.state.lock().stack.last().cloned()
    }

    /// The navigation stack, start panel first.
    pub fn stack(&self) -> Vec<String> {
        self.state.lock().stack.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn is_pinned(&self) -> bool {
        self.state.lock().pinned
    }

    /// Keep the menu open after key release and after commands.
    pub fn set_pinned(&self, pinned: bool) {
        self.state.lock().pinned = pinned;
    }

    /// Descriptions of the most recent distinct commands, most-recent-last.
    pub fn recent_commands(&self) -> Vec<String> {
        let limit = self.switchboard.config().marking_menu.recent_commands;
        self.switchboard
            .history()
            .recent_unique(limit)
            .into_iter()
            .map(|entry| entry.description)
            .collect()
    }

    /// Fill a list widget with the recent commands, newest first.
    pub fn populate_recent(&self, list: &WidgetHandle) -> Result<()> {
        let mut commands = self.recent_commands();
        commands.reverse();
        list.set_items(commands)
    }

    /// Repeat the newest command, then hide unless pinned.
    pub fn repeat_last(&self) -> Option<DispatchOutcome> {
        let outcome = self.switchboard.repeat_last();
        self.after_command();
        outcome
    }

    /// Dispatch a widget's signal from inside the menu, then hide unless
    /// pinned.
    pub fn invoke(&self, widget: WidgetId, payload: Payload) -> DispatchOutcome {
        let outcome = self.switchboard.dispatch(widget, payload);
        self.after_command();
        outcome
    }

    fn after_command(&self) {
        let mut state = self.state.lock();
        if state.visible && !state.pinned {
            state.visible = false;
            tracing::trace!(target: "switchboard::marking_menu", "hidden after command");
        }
    }
}
