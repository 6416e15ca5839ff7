//! State-keyed synchronization rules.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use switchboard_core::{ConnectionId, Payload, SignalKind, WidgetId, WidgetResult, WidgetTree};

use super::ApplyGuard;
use super::range::expand_range;
use crate::error::{Result, SwitchboardError};

/// A state change applied to a target widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncAction {
    /// `setEnabled`
    Enable,
    /// `setDisabled`
    Disable,
    /// `setChecked`
    Check,
    /// `setUnChecked`
    Uncheck,
    /// `setVisible`
    Show,
    /// `setHidden`
    Hide,
}

impl SyncAction {
    /// The setter name this action is written as.
    pub fn name(self) -> &'static str {
        match self {
            SyncAction::Enable => "setEnabled",
            SyncAction::Disable => "setDisabled",
            SyncAction::Check => "setChecked",
            SyncAction::Uncheck => "setUnChecked",
            SyncAction::Show => "setVisible",
            SyncAction::Hide => "setHidden",
        }
    }

    /// Apply the action to a widget.
    pub fn apply(self, tree: &WidgetTree, id: WidgetId) -> WidgetResult<()> {
        match self {
            SyncAction::Enable => tree.set_enabled(id, true),
            SyncAction::Disable => tree.set_enabled(id, false),
            SyncAction::Check => tree.set_checked(id, true).map(drop),
            SyncAction::Uncheck => tree.set_checked(id, false).map(drop),
            SyncAction::Show => tree.set_visible(id, true),
            SyncAction::Hide => tree.set_visible(id, false),
        }
    }
}

impl FromStr for SyncAction {
    type Err = SwitchboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "setEnabled" => Ok(SyncAction::Enable),
            "setDisabled" => Ok(SyncAction::Disable),
            "setChecked" => Ok(SyncAction::Check),
            "setUnChecked" => Ok(SyncAction::Uncheck),
            "setVisible" => Ok(SyncAction::Show),
            "setHidden" => Ok(SyncAction::Hide),
            other => Err(SwitchboardError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builder for a rule mapping a trigger's state to actions on other widgets.
///
/// Keys are the trigger's state: `"True"`/`"False"` for booleans, `"0"`,
/// `"1"`, … for indices. Targets are named by range expressions and looked
/// up below `container` each time the rule fires.
///
/// ```
/// use std::sync::Arc;
/// use switchboard::sync::ToggleMulti;
/// use switchboard_core::{SignalKind, WidgetClass, WidgetTree};
///
/// let tree = Arc::new(WidgetTree::new());
/// let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
/// let check = tree.insert(Some(panel), WidgetClass::CheckBox, "chk000").unwrap();
/// tree.set_checkable(check, true).unwrap();
/// let spin = tree.insert(Some(panel), WidgetClass::SpinBox, "s000").unwrap();
///
/// ToggleMulti::new(panel, check, SignalKind::Toggled)
///     .on("True", [("setDisabled", "s000")])
///     .on("False", [("setEnabled", "s000")])
///     .install(&tree)
///     .unwrap();
///
/// tree.set_checked(check, true).unwrap();
/// assert!(!tree.state(spin).unwrap().enabled);
/// ```
#[derive(Clone, Debug)]
pub struct ToggleMulti {
    container: WidgetId,
    trigger: WidgetId,
    signal: SignalKind,
    keys: Vec<(String, Vec<(String, String)>)>,
}

impl ToggleMulti {
    /// Start a rule on `trigger`'s `signal`, resolving targets under `container`.
    pub fn new(container: WidgetId, trigger: WidgetId, signal: SignalKind) -> Self {
        Self {
            container,
            trigger,
            signal,
            keys: Vec::new(),
        }
    }

    /// Add the actions applied when the trigger's state key is `key`.
    pub fn on<I, A, R>(mut self, key: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = (A, R)>,
        A: Into<String>,
        R: Into<String>,
    {
        let actions = actions
            .into_iter()
            .map(|(action, range)| (action.into(), range.into()))
            .collect();
        self.keys.push((normalize_key(key.into()), actions));
        self
    }

    /// Parse the actions, expand the ranges and connect the rule.
    pub fn install(self, tree: &Arc<WidgetTree>) -> Result<ToggleRule> {
        let mut compiled: HashMap<String, Vec<(SyncAction, Vec<String>)>> = HashMap::new();
        for (key, actions) in self.keys {
            let entry = compiled.entry(key).or_default();
            for (action, range) in actions {
                entry.push((action.parse()?, expand_range(&range)?));
            }
        }

        let rule = Arc::new(CompiledRule {
            tree: Arc::downgrade(tree),
            container: self.container,
            trigger: self.trigger,
            actions: compiled,
            applying: AtomicBool::new(false),
        });
        let connection = {
            let rule = Arc::clone(&rule);
            tree.signals(self.trigger)?
                .get(self.signal)
                .connect(move |payload| rule.fire(payload))
        };
        tracing::debug!(
            target: "switchboard::sync",
            trigger = ?self.trigger,
            signal = %self.signal,
            keys = rule.actions.len(),
            "installed toggle rule"
        );

        Ok(ToggleRule {
            tree: Arc::downgrade(tree),
            trigger: self.trigger,
            signal: self.signal,
            connection,
        })
    }
}

fn normalize_key(key: String) -> String {
    match key.as_str() {
        "true" => "True".to_string(),
        "false" => "False".to_string(),
        _ => key,
    }
}

struct CompiledRule {
    tree: Weak<WidgetTree>,
    container: WidgetId,
    trigger: WidgetId,
    actions: HashMap<String, Vec<(SyncAction, Vec<String>)>>,
    applying: AtomicBool,
}

impl CompiledRule {
    fn fire(&self, payload: &Payload) {
        let Some(tree) = self.tree.upgrade() else {
            return;
        };
        let Some(_guard) = ApplyGuard::enter(&self.applying) else {
            tracing::trace!(target: "switchboard::sync", trigger = ?self.trigger, "ignoring re-entrant emission");
            return;
        };

        // Clicks carry no state; fall back to the trigger's checked flag.
        let key = payload.state_key().or_else(|| {
            tree.state(self.trigger)
                .ok()
                .map(|state| Payload::Bool(state.checked))
                .and_then(|p| p.state_key())
        });
        let Some(actions) = key.as_deref().and_then(|key| self.actions.get(key)) else {
            tracing::trace!(target: "switchboard::sync", trigger = ?self.trigger, ?key, "no actions for state");
            return;
        };

        for (action, names) in actions {
            for name in names {
                match tree.find_descendant(self.container, name) {
                    Ok(Some(target)) => {
                        if let Err(err) = action.apply(&tree, target) {
                            tracing::warn!(target: "switchboard::sync", name = %name, %action, error = %err, "sync action failed");
                        }
                    }
                    Ok(None) => {
                        tracing::trace!(target: "switchboard::sync", name = %name, "sync target not found");
                    }
                    Err(err) => {
                        tracing::warn!(target: "switchboard::sync", error = %err, "sync container vanished");
                        return;
                    }
                }
            }
        }
    }
}

/// An installed synchronization rule.
#[derive(Debug)]
pub struct ToggleRule {
    tree: Weak<WidgetTree>,
    trigger: WidgetId,
    signal: SignalKind,
    connection: ConnectionId,
}

impl ToggleRule {
    /// The trigger widget.
    pub fn trigger(&self) -> WidgetId {
        self.trigger
    }

    /// Stop reacting to the trigger. Returns whether the rule was still connected.
    pub fn disconnect(&self) -> bool {
        let Some(tree) = self.tree.upgrade() else {
            return false;
        };
        tree.signals(self.trigger)
            .map(|signals| signals.get(self.signal).disconnect(self.connection))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::WidgetClass;

    struct Fixture {
        tree: Arc<WidgetTree>,
        panel: WidgetId,
    }

    impl Fixture {
        fn new() -> Self {
            let tree = Arc::new(WidgetTree::new());
            let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
            Self { tree, panel }
        }

        fn add(&self, class: WidgetClass, name: &str) -> WidgetId {
            let id = self.tree.insert(Some(self.panel), class, name).unwrap();
            if class.is_checkable_by_default() {
                self.tree.set_checkable(id, true).unwrap();
            }
            id
        }

        fn enabled(&self, id: WidgetId) -> bool {
            self.tree.state(id).unwrap().enabled
        }
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in [
            SyncAction::Enable,
            SyncAction::Disable,
            SyncAction::Check,
            SyncAction::Uncheck,
            SyncAction::Show,
            SyncAction::Hide,
        ] {
            assert_eq!(action.name().parse::<SyncAction>().unwrap(), action);
        }
        assert!(matches!(
            "setFrobbed".parse::<SyncAction>(),
            Err(SwitchboardError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_index_two_disables_exactly_range() {
        let fx = Fixture::new();
        let combo = fx.add(WidgetClass::ComboBox, "cmb000");
        let spins: Vec<WidgetId> = (5..=9)
            .map(|i| fx.add(WidgetClass::SpinBox, &format!("s{i:03}")))
            .collect();

        ToggleMulti::new(fx.panel, combo, SignalKind::IndexChanged)
            .on("2", [("setDisabled", "s006-8")])
            .install(&fx.tree)
            .unwrap();

        fx.tree.set_index(combo, 2).unwrap();
        let enabled: Vec<bool> = spins.iter().map(|id| fx.enabled(*id)).collect();
        assert_eq!(enabled, vec![true, false, false, false, true]);
        assert!(fx.enabled(combo));
    }

    #[test]
    fn test_boolean_round_trip_restores_state() {
        let fx = Fixture::new();
        let trigger = fx.add(WidgetClass::CheckBox, "chk000");
        let a = fx.add(WidgetClass::SpinBox, "s000");
        let b = fx.add(WidgetClass::CheckBox, "chk001");
        fx.tree.set_checked(b, true).unwrap();
        let before: Vec<_> = [a, b].iter().map(|id| fx.tree.state(*id).unwrap()).collect();

        ToggleMulti::new(fx.panel, trigger, SignalKind::Toggled)
            .on("True", [("setDisabled", "s000"), ("setUnChecked", "chk001")])
            .on("False", [("setEnabled", "s000"), ("setChecked", "chk001")])
            .install(&fx.tree)
            .unwrap();

        fx.tree.set_checked(trigger, true).unwrap();
        assert!(!fx.enabled(a));
        assert!(!fx.tree.state(b).unwrap().checked);

        fx.tree.set_checked(trigger, false).unwrap();
        let after: Vec<_> = [a, b].iter().map(|id| fx.tree.state(*id).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unmatched_key_and_missing_target_are_noops() {
        let fx = Fixture::new();
        let combo = fx.add(WidgetClass::ComboBox, "cmb000");
        let spin = fx.add(WidgetClass::SpinBox, "s000");

        ToggleMulti::new(fx.panel, combo, SignalKind::IndexChanged)
            .on("1", [("setDisabled", "s000-2")])
            .install(&fx.tree)
            .unwrap();

        fx.tree.set_index(combo, 3).unwrap();
        assert!(fx.enabled(spin));
        fx.tree.set_index(combo, 1).unwrap();
        assert!(!fx.enabled(spin));
    }

    #[test]
    fn test_click_uses_checked_state() {
        let fx = Fixture::new();
        let button = fx.add(WidgetClass::PushButton, "b000");
        fx.tree.set_checkable(button, true).unwrap();
        let spin = fx.add(WidgetClass::SpinBox, "s000");

        ToggleMulti::new(fx.panel, button, SignalKind::Clicked)
            .on("true", [("setHidden", "s000")])
            .on("false", [("setVisible", "s000")])
            .install(&fx.tree)
            .unwrap();

        fx.tree.click(button).unwrap();
        assert!(!fx.tree.state(spin).unwrap().visible);
        fx.tree.click(button).unwrap();
        assert!(fx.tree.state(spin).unwrap().visible);
    }

    #[test]
    fn test_rule_ignores_its_own_feedback() {
        let fx = Fixture::new();
        let a = fx.add(WidgetClass::CheckBox, "chk000");

        // The rule flips its own trigger; without the applying flag this
        // would recurse forever.
        ToggleMulti::new(fx.panel, a, SignalKind::Toggled)
            .on("True", [("setUnChecked", "chk000")])
            .on("False", [("setChecked", "chk000")])
            .install(&fx.tree)
            .unwrap();

        fx.tree.set_checked(a, true).unwrap();
        assert!(!fx.tree.state(a).unwrap().checked);
    }

    #[test]
    fn test_disconnect_and_invalid_install() {
        let fx = Fixture::new();
        let combo = fx.add(WidgetClass::ComboBox, "cmb000");
        let spin = fx.add(WidgetClass::SpinBox, "s000");

        let rule = ToggleMulti::new(fx.panel, combo, SignalKind::IndexChanged)
            .on("0", [("setDisabled", "s000")])
            .install(&fx.tree)
            .unwrap();
        assert_eq!(rule.trigger(), combo);
        assert!(rule.disconnect());
        assert!(!rule.disconnect());
        fx.tree.set_index(combo, 0).unwrap();
        assert!(fx.enabled(spin));

        let bad = ToggleMulti::new(fx.panel, combo, SignalKind::IndexChanged)
            .on("0", [("setDisabled", "s003-1")])
            .install(&fx.tree);
        assert!(matches!(bad, Err(SwitchboardError::InvalidRange(_))));
    }
}
