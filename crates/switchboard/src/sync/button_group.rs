//! Exclusive selection among checkable widgets.
//!
//! A [`ButtonGroup`] is a coordinator, not a container: member widgets stay
//! where they were built, and the group listens to their `toggled` signals.
//! When one member becomes checked every other checked member is unchecked.
//! Unchecking the current member is reverted unless the group allows full
//! deselection.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use switchboard_core::{ConnectionId, Payload, Signal, WidgetId, WidgetTree};

use super::ApplyGuard;
use super::range::expand_range;
use crate::error::{Result, SwitchboardError};

#[derive(Clone, Copy, Debug)]
struct Member {
    widget: WidgetId,
    id: i32,
    connection: ConnectionId,
}

#[derive(Debug)]
struct GroupState {
    members: Vec<Member>,
    checked: Option<WidgetId>,
    next_auto_id: i32,
}

/// Mutually exclusive set of checkable widgets.
///
/// Member ids are assigned by the caller or generated; generated ids are
/// negative starting at -2, and -1 means "no button".
pub struct ButtonGroup {
    tree: Arc<WidgetTree>,
    this: Weak<ButtonGroup>,
    allow_deselect: bool,
    state: Mutex<GroupState>,
    applying: AtomicBool,
    pruning: ConnectionId,

    /// Emitted with `(member id, checked)` whenever a member's checked state
    /// changes.
    pub id_toggled: Signal<(i32, bool)>,
}

impl std::fmt::Debug for ButtonGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ButtonGroup")
            .field("members", &state.members.len())
            .field("checked", &state.checked)
            .field("allow_deselect", &self.allow_deselect)
            .finish()
    }
}

impl ButtonGroup {
    /// Create an empty group over widgets of `tree`.
    pub fn new(tree: &Arc<WidgetTree>, allow_deselect: bool) -> Arc<Self> {
        Arc::new_cyclic(|this| {
            let group: Weak<ButtonGroup> = this.clone();
            let pruning = tree.destroyed().connect(move |ids| {
                if let Some(group) = group.upgrade() {
                    group.forget_members(ids);
                }
            });
            Self {
                tree: Arc::clone(tree),
                this: this.clone(),
                allow_deselect,
                state: Mutex::new(GroupState {
                    members: Vec::new(),
                    checked: None,
                    next_auto_id: -2,
                }),
                applying: AtomicBool::new(false),
                pruning,
                id_toggled: Signal::new(),
            }
        })
    }

    /// Whether the checked member may be unchecked, leaving none checked.
    pub fn allows_deselect(&self) -> bool {
        self.allow_deselect
    }

    /// Add a widget with a generated id; returns the id.
    pub fn add_button(&self, widget: WidgetId) -> Result<i32> {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_auto_id;
            state.next_auto_id -= 1;
            id
        };
        self.add_button_with_id(widget, id)?;
        Ok(id)
    }

    /// Add a widget with a caller-chosen id.
    ///
    /// The widget is made checkable. If it is already checked it becomes the
    /// group's checked member.
    pub fn add_button_with_id(&self, widget: WidgetId, id: i32) -> Result<()> {
        let tree = &self.tree;
        if self.contains(widget) {
            self.remove_button(widget);
        }
        tree.set_checkable(widget, true)?;

        let group = self.this.clone();
        let connection = tree.signals(widget)?.toggled.connect(move |payload| {
            if let (Some(group), Payload::Bool(checked)) = (group.upgrade(), payload) {
                group.member_toggled(widget, *checked);
            }
        });
        self.state.lock().members.push(Member {
            widget,
            id,
            connection,
        });

        if tree.state(widget)?.checked {
            self.member_toggled(widget, true);
        }
        Ok(())
    }

    /// Remove a widget; returns its id if it was a member.
    pub fn remove_button(&self, widget: WidgetId) -> Option<i32> {
        let member = {
            let mut state = self.state.lock();
            let index = state.members.iter().position(|m| m.widget == widget)?;
            if state.checked == Some(widget) {
                state.checked = None;
            }
            state.members.remove(index)
        };
        if let Ok(signals) = self.tree.signals(widget) {
            signals.toggled.disconnect(member.connection);
        }
        Some(member.id)
    }

    /// Member widgets, in insertion order.
    pub fn buttons(&self) -> Vec<WidgetId> {
        self.state.lock().members.iter().map(|m| m.widget).collect()
    }

    /// Whether the widget is a member.
    pub fn contains(&self, widget: WidgetId) -> bool {
        self.state.lock().members.iter().any(|m| m.widget == widget)
    }

    /// The id of a member, or -1.
    pub fn id(&self, widget: WidgetId) -> i32 {
        self.member_id(widget).unwrap_or(-1)
    }

    fn member_id(&self, widget: WidgetId) -> Option<i32> {
        self.state
            .lock()
            .members
            .iter()
            .find(|m| m.widget == widget)
            .map(|m| m.id)
    }

    /// The member with the given id.
    pub fn button(&self, id: i32) -> Option<WidgetId> {
        self.state
            .lock()
            .members
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.widget)
    }

    /// The checked member.
    pub fn checked(&self) -> Option<WidgetId> {
        self.state.lock().checked
    }

    /// The id of the checked member, or -1.
    pub fn checked_id(&self) -> i32 {
        self.checked().map_or(-1, |widget| self.id(widget))
    }

    /// Drop destroyed widgets from the group.
    fn forget_members(&self, ids: &[WidgetId]) {
        let mut state = self.state.lock();
        state.members.retain(|member| !ids.contains(&member.widget));
        if state.checked.is_some_and(|checked| ids.contains(&checked)) {
            state.checked = None;
        }
    }

    fn member_toggled(&self, widget: WidgetId, checked: bool) {
        let Some(id) = self.member_id(widget) else {
            return;
        };
        self.id_toggled.emit((id, checked));

        let tree = &self.tree;
        let Some(_guard) = ApplyGuard::enter(&self.applying) else {
            return;
        };

        if checked {
            let others: Vec<WidgetId> = {
                let mut state = self.state.lock();
                state.checked = Some(widget);
                state
                    .members
                    .iter()
                    .map(|m| m.widget)
                    .filter(|w| *w != widget)
                    .collect()
            };
            for other in others {
                if let Err(err) = tree.set_checked(other, false) {
                    tracing::warn!(target: "switchboard::sync", error = %err, "failed to uncheck group member");
                }
            }
        } else {
            let revert = {
                let mut state = self.state.lock();
                if state.checked != Some(widget) {
                    false
                } else if self.allow_deselect {
                    state.checked = None;
                    false
                } else {
                    true
                }
            };
            if revert {
                tracing::trace!(target: "switchboard::sync", id, "keeping exclusive member checked");
                if let Err(err) = tree.set_checked(widget, true) {
                    tracing::warn!(target: "switchboard::sync", error = %err, "failed to re-check group member");
                }
            }
        }
    }
}

impl Drop for ButtonGroup {
    fn drop(&mut self) {
        self.tree.destroyed().disconnect(self.pruning);
        for member in self.state.get_mut().members.drain(..) {
            if let Ok(signals) = self.tree.signals(member.widget) {
                signals.toggled.disconnect(member.connection);
            }
        }
    }
}

/// Build one exclusive group per range expression, resolving member names
/// below `container`.
///
/// Every named widget must exist.
pub fn create_button_groups<S: AsRef<str>>(
    tree: &Arc<WidgetTree>,
    container: WidgetId,
    ranges: &[S],
    allow_deselect: bool,
) -> Result<Vec<Arc<ButtonGroup>>> {
    ranges
        .iter()
        .map(|range| {
            let group = ButtonGroup::new(tree, allow_deselect);
            for name in expand_range(range.as_ref())? {
                let widget = tree.find_descendant(container, &name)?.ok_or_else(|| {
                    SwitchboardError::UnknownWidget {
                        scope: tree.name(container).unwrap_or_default(),
                        name: name.clone(),
                    }
                })?;
                group.add_button(widget)?;
            }
            Ok(group)
        })
        .collect()
}
