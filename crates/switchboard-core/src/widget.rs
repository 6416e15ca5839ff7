//! Retained widget tree for Switchboard.
//!
//! Provides the arena that holds every Widget Node of every panel:
//! - Stable widget identifiers via slot-map storage
//! - Parent-child ownership with cascade destroy
//! - Object names unique within their immediate panel/menu scope
//! - Per-node state (enabled, checked, value, ...) and per-node signals
//!
//! # Key Types
//!
//! - [`WidgetTree`] - The arena; shared as `Arc<WidgetTree>`
//! - [`WidgetId`] - Stable identifier for each node
//! - [`WidgetClass`] - Concrete toolkit class of a node
//! - [`WidgetState`] - Snapshot of a node's mutable state
//! - [`WidgetSignals`] - The signals a node emits
//!
//! # Emission Rules
//!
//! Setters write the new state while holding the arena lock, release it and
//! only then emit, so every slot observes the already-mutated state and may
//! freely call back into the tree. A setter emits only when the value
//! actually changed; [`WidgetTree::apply_signal`] (a toolkit-originated
//! signal) always emits.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use crate::error::{WidgetError, WidgetResult};
use crate::signal::Signal;

new_key_type! {
    /// A unique identifier for a node in the widget tree.
    ///
    /// IDs remain valid until the node (or one of its ancestors) is destroyed.
    pub struct WidgetId;
}

impl WidgetId {
    /// Convert the id to a raw u64 value, for interop with toolkit handles.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Rebuild an id from [`WidgetId::as_raw`]. Existence is not checked.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

// ============================================================================
// Signals and payloads
// ============================================================================

/// The signals a widget node can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// A button was clicked (or a label released).
    Clicked,
    /// A checkable widget changed its checked state.
    Toggled,
    /// A combo box or list changed its current index.
    IndexChanged,
    /// A spin box changed its value.
    ValueChanged,
    /// A line edit changed its text.
    TextChanged,
}

impl SignalKind {
    /// All signal kinds, in declaration order.
    pub const ALL: [SignalKind; 5] = [
        SignalKind::Clicked,
        SignalKind::Toggled,
        SignalKind::IndexChanged,
        SignalKind::ValueChanged,
        SignalKind::TextChanged,
    ];

    /// The toolkit-facing signal name.
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Clicked => "clicked",
            SignalKind::Toggled => "toggled",
            SignalKind::IndexChanged => "currentIndexChanged",
            SignalKind::ValueChanged => "valueChanged",
            SignalKind::TextChanged => "textChanged",
        }
    }

    /// Look up a signal kind by its toolkit-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value carried by a signal emission.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    /// No value (clicks).
    #[default]
    None,
    /// A checked state.
    Bool(bool),
    /// A current index.
    Index(i32),
    /// A numeric value.
    Value(f64),
    /// A text value.
    Text(String),
}

impl Payload {
    /// The key a synchronization rule matches this payload against.
    ///
    /// Booleans map to `"True"`/`"False"`, indices to their decimal string,
    /// integral values to their integer string. `None` has no key.
    pub fn state_key(&self) -> Option<String> {
        match self {
            Payload::None => None,
            Payload::Bool(true) => Some("True".to_string()),
            Payload::Bool(false) => Some("False".to_string()),
            Payload::Index(index) => Some(index.to_string()),
            Payload::Value(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(format!("{}", *value as i64))
            }
            Payload::Value(value) => Some(value.to_string()),
            Payload::Text(text) => Some(text.clone()),
        }
    }
}

/// One signal per [`SignalKind`], owned by every widget node.
#[derive(Default)]
pub struct WidgetSignals {
    /// Emitted on click.
    pub clicked: Signal<Payload>,
    /// Emitted when the checked state changes.
    pub toggled: Signal<Payload>,
    /// Emitted when the current index changes.
    pub index_changed: Signal<Payload>,
    /// Emitted when the value changes.
    pub value_changed: Signal<Payload>,
    /// Emitted when the text changes.
    pub text_changed: Signal<Payload>,
}

impl WidgetSignals {
    /// Get the signal for a kind.
    pub fn get(&self, kind: SignalKind) -> &Signal<Payload> {
        match kind {
            SignalKind::Clicked => &self.clicked,
            SignalKind::Toggled => &self.toggled,
            SignalKind::IndexChanged => &self.index_changed,
            SignalKind::ValueChanged => &self.value_changed,
            SignalKind::TextChanged => &self.text_changed,
        }
    }
}

// ============================================================================
// Widget classes
// ============================================================================

/// The concrete toolkit class of a widget node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetClass {
    /// Root of a panel; a naming scope.
    Panel,
    /// A (possibly nested) menu, option menu or context menu; a naming scope.
    Menu,
    /// Plain push button.
    PushButton,
    /// Tool button, usually carrying an option menu.
    ToolButton,
    /// Static text.
    Label,
    /// Drop-down selection.
    ComboBox,
    /// Check box.
    CheckBox,
    /// Radio button.
    RadioButton,
    /// Integer spin box.
    SpinBox,
    /// Floating point spin box.
    DoubleSpinBox,
    /// Single line text entry.
    LineEdit,
    /// Item list.
    ListWidget,
    /// Visual separator.
    Separator,
    /// Grouping container without naming scope.
    Container,
}

impl WidgetClass {
    const TAGS: [(&'static str, WidgetClass); 14] = [
        ("QWidget", WidgetClass::Container),
        ("QMainWindow", WidgetClass::Panel),
        ("QMenu", WidgetClass::Menu),
        ("QPushButton", WidgetClass::PushButton),
        ("QToolButton", WidgetClass::ToolButton),
        ("QLabel", WidgetClass::Label),
        ("QComboBox", WidgetClass::ComboBox),
        ("QCheckBox", WidgetClass::CheckBox),
        ("QRadioButton", WidgetClass::RadioButton),
        ("QSpinBox", WidgetClass::SpinBox),
        ("QDoubleSpinBox", WidgetClass::DoubleSpinBox),
        ("QLineEdit", WidgetClass::LineEdit),
        ("QListWidget", WidgetClass::ListWidget),
        ("QSeparator", WidgetClass::Separator),
    ];

    /// Map a symbolic tag to a class.
    ///
    /// Accepts toolkit class names (`"QCheckBox"`) as well as their
    /// case-insensitive short form without the `Q` prefix (`"checkbox"`).
    pub fn from_tag(tag: &str) -> WidgetResult<Self> {
        Self::TAGS
            .iter()
            .find(|(name, _)| {
                *name == tag || name[1..].eq_ignore_ascii_case(tag)
            })
            .map(|(_, class)| *class)
            .ok_or_else(|| WidgetError::UnknownTag(tag.to_string()))
    }

    /// The toolkit class name of this class.
    pub fn tag(self) -> &'static str {
        Self::TAGS
            .iter()
            .find(|(_, class)| *class == self)
            .map(|(name, _)| *name)
            .unwrap_or("QWidget")
    }

    /// The signal the dispatcher listens to for this class.
    pub fn default_signal(self) -> Option<SignalKind> {
        match self {
            WidgetClass::PushButton | WidgetClass::ToolButton | WidgetClass::Label => {
                Some(SignalKind::Clicked)
            }
            WidgetClass::CheckBox | WidgetClass::RadioButton => Some(SignalKind::Toggled),
            WidgetClass::ComboBox | WidgetClass::ListWidget => Some(SignalKind::IndexChanged),
            WidgetClass::SpinBox | WidgetClass::DoubleSpinBox => Some(SignalKind::ValueChanged),
            WidgetClass::LineEdit => Some(SignalKind::TextChanged),
            WidgetClass::Panel
            | WidgetClass::Menu
            | WidgetClass::Separator
            | WidgetClass::Container => None,
        }
    }

    /// Whether nodes of this class open a new naming scope.
    pub fn is_scope(self) -> bool {
        matches!(self, WidgetClass::Panel | WidgetClass::Menu)
    }

    /// Whether new nodes of this class start out checkable.
    pub fn is_checkable_by_default(self) -> bool {
        matches!(self, WidgetClass::CheckBox | WidgetClass::RadioButton)
    }

    /// Whether the class presents a numeric value.
    pub fn is_numeric(self) -> bool {
        matches!(self, WidgetClass::SpinBox | WidgetClass::DoubleSpinBox)
    }
}

impl fmt::Display for WidgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Widget state
// ============================================================================

/// Numeric range of a spin-like widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
    /// Single step increment.
    pub step: f64,
    /// Number of decimals shown.
    pub decimals: u32,
}

impl Limits {
    /// Create limits; `min` and `max` are swapped if given in reverse.
    pub fn new(min: f64, max: f64, step: f64, decimals: u32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            step,
            decimals,
        }
    }

    /// Clamp a value into the range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Snapshot of a widget node's mutable state.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetState {
    /// Whether the widget accepts input.
    pub enabled: bool,
    /// Whether the widget is shown.
    pub visible: bool,
    /// Whether the widget can be checked.
    pub checkable: bool,
    /// Checked state (meaningful when `checkable`).
    pub checked: bool,
    /// Display or entered text.
    pub text: String,
    /// Tool tip text.
    pub tool_tip: String,
    /// Numeric value for spin-like widgets.
    pub value: f64,
    /// Current index for combo boxes and lists; `-1` when none.
    pub index: i32,
    /// Items of a combo box or list.
    pub items: Vec<String>,
    /// Numeric range, if any.
    pub limits: Option<Limits>,
    /// Sparse value to label overrides shown instead of the number.
    pub display_values: Vec<(f64, String)>,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            enabled: true,
            visible: true,
            checkable: false,
            checked: false,
            text: String::new(),
            tool_tip: String::new(),
            value: 0.0,
            index: -1,
            items: Vec::new(),
            limits: None,
            display_values: Vec::new(),
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

struct WidgetNode {
    name: String,
    class: WidgetClass,
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    option_menu: Option<WidgetId>,
    context_menu: Option<WidgetId>,
    state: WidgetState,
    signals: Arc<WidgetSignals>,
}

/// Which attached menu of a widget to address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuSlot {
    /// The option menu opened from the widget itself.
    Option,
    /// The right-click context menu.
    Context,
}

/// The arena holding every widget node.
///
/// All methods take `&self`; the arena is guarded by a read-write lock that is
/// never held while a signal is emitted.
pub struct WidgetTree {
    nodes: RwLock<SlotMap<WidgetId, WidgetNode>>,
    destroyed: Signal<Vec<WidgetId>>,
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WidgetTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetTree")
            .field("node_count", &self.node_count())
            .finish()
    }
}

impl WidgetTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(SlotMap::with_key()),
            destroyed: Signal::new(),
        }
    }

    /// Emitted after [`destroy`](Self::destroy) with every removed id,
    /// the destroyed node first.
    pub fn destroyed(&self) -> &Signal<Vec<WidgetId>> {
        &self.destroyed
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Whether the id refers to a live node.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.nodes.read().contains_key(id)
    }

    /// All nodes without a parent.
    pub fn roots(&self) -> Vec<WidgetId> {
        self.nodes
            .read()
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Insert a node under `parent` (or as a root).
    ///
    /// Non-empty names must be unique within the parent's naming scope.
    pub fn insert(
        &self,
        parent: Option<WidgetId>,
        class: WidgetClass,
        name: impl Into<String>,
    ) -> WidgetResult<WidgetId> {
        let name = name.into();
        let mut nodes = self.nodes.write();

        if let Some(parent_id) = parent {
            if !nodes.contains_key(parent_id) {
                return Err(WidgetError::InvalidWidgetId(parent_id));
            }
            if !name.is_empty() {
                let scope = scope_of(&nodes, parent_id);
                if find_in_scope(&nodes, scope, &name).is_some() {
                    return Err(WidgetError::DuplicateName {
                        scope: nodes[scope].name.clone(),
                        name,
                    });
                }
            }
        }

        let state = WidgetState {
            checkable: class.is_checkable_by_default(),
            ..WidgetState::default()
        };
        let id = nodes.insert(WidgetNode {
            name,
            class,
            parent,
            children: Vec::new(),
            option_menu: None,
            context_menu: None,
            state,
            signals: Arc::new(WidgetSignals::default()),
        });
        if let Some(parent_id) = parent {
            nodes[parent_id].children.push(id);
        }
        tracing::trace!(target: "switchboard_core::widget", ?id, %class, name = %nodes[id].name, "inserted widget");
        Ok(id)
    }

    /// Destroy a node and all its descendants.
    #[tracing::instrument(skip(self), target = "switchboard_core::widget", level = "trace")]
    pub fn destroy(&self, id: WidgetId) -> WidgetResult<()> {
        let removed = {
            let mut nodes = self.nodes.write();
            if !nodes.contains_key(id) {
                return Err(WidgetError::InvalidWidgetId(id));
            }

            if let Some(parent_id) = nodes[id].parent {
                if let Some(parent) = nodes.get_mut(parent_id) {
                    parent.children.retain(|&child| child != id);
                    if parent.option_menu == Some(id) {
                        parent.option_menu = None;
                    }
                    if parent.context_menu == Some(id) {
                        parent.context_menu = None;
                    }
                }
            }

            let mut removed = Vec::new();
            let mut stack = vec![id];
            while let Some(current) = stack.pop() {
                if let Some(node) = nodes.remove(current) {
                    removed.push(current);
                    stack.extend(node.children);
                }
            }
            removed
        };
        self.destroyed.emit(removed);
        Ok(())
    }

    /// Move a node under a new parent (or make it a root).
    pub fn set_parent(&self, id: WidgetId, new_parent: Option<WidgetId>) -> WidgetResult<()> {
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(id) {
            return Err(WidgetError::InvalidWidgetId(id));
        }
        if let Some(parent_id) = new_parent {
            if !nodes.contains_key(parent_id) {
                return Err(WidgetError::InvalidWidgetId(parent_id));
            }
            let mut current = Some(parent_id);
            while let Some(ancestor) = current {
                if ancestor == id {
                    return Err(WidgetError::CircularParentage);
                }
                current = nodes[ancestor].parent;
            }
            let name = nodes[id].name.clone();
            if !name.is_empty() {
                let scope = scope_of(&nodes, parent_id);
                if find_in_scope(&nodes, scope, &name).is_some_and(|found| found != id) {
                    return Err(WidgetError::DuplicateName {
                        scope: nodes[scope].name.clone(),
                        name,
                    });
                }
            }
        }

        if let Some(old_parent) = nodes[id].parent {
            if let Some(parent) = nodes.get_mut(old_parent) {
                parent.children.retain(|&child| child != id);
            }
        }
        nodes[id].parent = new_parent;
        if let Some(parent_id) = new_parent {
            nodes[parent_id].children.push(id);
        }
        Ok(())
    }

    /// The node's object name.
    pub fn name(&self, id: WidgetId) -> WidgetResult<String> {
        self.read(id, |node| node.name.clone())
    }

    /// Rename a node, keeping names unique within its scope.
    pub fn set_name(&self, id: WidgetId, name: impl Into<String>) -> WidgetResult<()> {
        let name = name.into();
        let mut nodes = self.nodes.write();
        let node = nodes.get(id).ok_or(WidgetError::InvalidWidgetId(id))?;
        if node.name == name {
            return Ok(());
        }
        if let (Some(parent), false) = (node.parent, name.is_empty()) {
            let scope = scope_of(&nodes, parent);
            if find_in_scope(&nodes, scope, &name).is_some() {
                return Err(WidgetError::DuplicateName {
                    scope: nodes[scope].name.clone(),
                    name,
                });
            }
        }
        nodes[id].name = name;
        Ok(())
    }

    /// The node's class.
    pub fn class(&self, id: WidgetId) -> WidgetResult<WidgetClass> {
        self.read(id, |node| node.class)
    }

    /// The node's parent.
    pub fn parent(&self, id: WidgetId) -> WidgetResult<Option<WidgetId>> {
        self.read(id, |node| node.parent)
    }

    /// The node's children, in insertion order.
    pub fn children(&self, id: WidgetId) -> WidgetResult<Vec<WidgetId>> {
        self.read(id, |node| node.children.clone())
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(&self, id: WidgetId) -> WidgetResult<Vec<WidgetId>> {
        let nodes = self.nodes.read();
        let node = nodes.get(id).ok_or(WidgetError::InvalidWidgetId(id))?;
        let mut result = Vec::new();
        let mut current = node.parent;
        while let Some(ancestor) = current {
            result.push(ancestor);
            current = nodes.get(ancestor).and_then(|n| n.parent);
        }
        Ok(result)
    }

    /// The nearest panel or menu enclosing `id` (the node itself if it is one).
    pub fn scope(&self, id: WidgetId) -> WidgetResult<WidgetId> {
        let nodes = self.nodes.read();
        if !nodes.contains_key(id) {
            return Err(WidgetError::InvalidWidgetId(id));
        }
        Ok(scope_of(&nodes, id))
    }

    /// The panel root owning `id`, if any.
    pub fn panel_of(&self, id: WidgetId) -> WidgetResult<Option<WidgetId>> {
        let nodes = self.nodes.read();
        if !nodes.contains_key(id) {
            return Err(WidgetError::InvalidWidgetId(id));
        }
        let mut current = Some(id);
        while let Some(candidate) = current {
            let node = &nodes[candidate];
            if node.class == WidgetClass::Panel {
                return Ok(Some(candidate));
            }
            current = node.parent;
        }
        Ok(None)
    }

    /// Find a node by name within a naming scope.
    ///
    /// Nested panels and menus are not searched, but their own names are.
    pub fn find_in_scope(&self, scope: WidgetId, name: &str) -> WidgetResult<Option<WidgetId>> {
        let nodes = self.nodes.read();
        if !nodes.contains_key(scope) {
            return Err(WidgetError::InvalidWidgetId(scope));
        }
        Ok(find_in_scope(&nodes, scope, name))
    }

    /// Breadth-first search for the first descendant named `name`.
    pub fn find_descendant(&self, root: WidgetId, name: &str) -> WidgetResult<Option<WidgetId>> {
        let nodes = self.nodes.read();
        let node = nodes.get(root).ok_or(WidgetError::InvalidWidgetId(root))?;
        let mut queue: VecDeque<WidgetId> = node.children.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            let node = &nodes[current];
            if node.name == name {
                return Ok(Some(current));
            }
            queue.extend(node.children.iter().copied());
        }
        Ok(None)
    }

    /// Every node below `root`, depth-first pre-order, excluding `root`.
    pub fn descendants(&self, root: WidgetId) -> WidgetResult<Vec<WidgetId>> {
        let nodes = self.nodes.read();
        let node = nodes.get(root).ok_or(WidgetError::InvalidWidgetId(root))?;
        let mut result = Vec::new();
        let mut stack: Vec<WidgetId> = node.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(nodes[current].children.iter().rev().copied());
        }
        Ok(result)
    }

    /// The attached option or context menu of a widget.
    pub fn attached_menu(&self, id: WidgetId, slot: MenuSlot) -> WidgetResult<Option<WidgetId>> {
        self.read(id, |node| match slot {
            MenuSlot::Option => node.option_menu,
            MenuSlot::Context => node.context_menu,
        })
    }

    /// Get the attached menu of a widget, creating it on first use.
    pub fn ensure_attached_menu(&self, id: WidgetId, slot: MenuSlot) -> WidgetResult<WidgetId> {
        if let Some(existing) = self.attached_menu(id, slot)? {
            return Ok(existing);
        }
        // Attached menus are unnamed so they never collide inside the owner's scope.
        let menu = self.insert(Some(id), WidgetClass::Menu, "")?;
        let mut nodes = self.nodes.write();
        let node = nodes.get_mut(id).ok_or(WidgetError::InvalidWidgetId(id))?;
        match slot {
            MenuSlot::Option => node.option_menu = Some(menu),
            MenuSlot::Context => node.context_menu = Some(menu),
        }
        Ok(menu)
    }

    /// The widget an attached menu belongs to, if `menu` is one.
    pub fn menu_owner(&self, menu: WidgetId) -> WidgetResult<Option<WidgetId>> {
        let nodes = self.nodes.read();
        let node = nodes.get(menu).ok_or(WidgetError::InvalidWidgetId(menu))?;
        Ok(node.parent.filter(|parent| {
            let owner = &nodes[*parent];
            owner.option_menu == Some(menu) || owner.context_menu == Some(menu)
        }))
    }

    /// Snapshot of a node's state.
    pub fn state(&self, id: WidgetId) -> WidgetResult<WidgetState> {
        self.read(id, |node| node.state.clone())
    }

    /// The signal bundle of a node.
    pub fn signals(&self, id: WidgetId) -> WidgetResult<Arc<WidgetSignals>> {
        self.read(id, |node| Arc::clone(&node.signals))
    }

    // =========================================================================
    // Silent setters
    // =========================================================================

    /// Enable or disable a widget.
    pub fn set_enabled(&self, id: WidgetId, enabled: bool) -> WidgetResult<()> {
        self.write(id, |state| state.enabled = enabled)
    }

    /// Show or hide a widget.
    pub fn set_visible(&self, id: WidgetId, visible: bool) -> WidgetResult<()> {
        self.write(id, |state| state.visible = visible)
    }

    /// Make a widget checkable or not.
    pub fn set_checkable(&self, id: WidgetId, checkable: bool) -> WidgetResult<()> {
        self.write(id, |state| state.checkable = checkable)
    }

    /// Set the tool tip.
    pub fn set_tool_tip(&self, id: WidgetId, tool_tip: impl Into<String>) -> WidgetResult<()> {
        let tool_tip = tool_tip.into();
        self.write(id, |state| state.tool_tip = tool_tip)
    }

    /// Replace the items of a combo box or list.
    ///
    /// The current index moves to the first item when it falls out of range.
    pub fn set_items<I, S>(&self, id: WidgetId, items: I) -> WidgetResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        self.write(id, |state| {
            let len = items.len() as i32;
            state.items = items;
            if state.index >= len || (state.index < 0 && len > 0) {
                state.index = if len > 0 { 0 } else { -1 };
            }
        })
    }

    /// Set numeric limits, re-clamping the current value.
    pub fn set_limits(&self, id: WidgetId, limits: Limits) -> WidgetResult<()> {
        self.write(id, |state| {
            state.value = limits.clamp(state.value);
            state.limits = Some(limits);
        })
    }

    /// Set the sparse value to label override map.
    pub fn set_display_values<I, S>(&self, id: WidgetId, values: I) -> WidgetResult<()>
    where
        I: IntoIterator<Item = (f64, S)>,
        S: Into<String>,
    {
        let values: Vec<(f64, String)> =
            values.into_iter().map(|(value, label)| (value, label.into())).collect();
        self.write(id, |state| state.display_values = values)
    }

    // =========================================================================
    // Notifying setters
    // =========================================================================

    /// Set the checked state; emits `toggled` when it changed.
    ///
    /// Non-checkable widgets ignore the call.
    pub fn set_checked(&self, id: WidgetId, checked: bool) -> WidgetResult<bool> {
        self.change(id, SignalKind::Toggled, |state| {
            if !state.checkable || state.checked == checked {
                return None;
            }
            state.checked = checked;
            Some(Payload::Bool(checked))
        })
    }

    /// Set the current index; emits `currentIndexChanged` when it changed.
    pub fn set_index(&self, id: WidgetId, index: i32) -> WidgetResult<bool> {
        self.change(id, SignalKind::IndexChanged, |state| {
            if state.index == index {
                return None;
            }
            state.index = index;
            Some(Payload::Index(index))
        })
    }

    /// Set the numeric value (clamped); emits `valueChanged` when it changed.
    pub fn set_value(&self, id: WidgetId, value: f64) -> WidgetResult<bool> {
        self.change(id, SignalKind::ValueChanged, |state| {
            let value = state.limits.map_or(value, |limits| limits.clamp(value));
            if state.value == value {
                return None;
            }
            state.value = value;
            Some(Payload::Value(value))
        })
    }

    /// Set the text; line edits emit `textChanged` when it changed.
    pub fn set_text(&self, id: WidgetId, text: impl Into<String>) -> WidgetResult<bool> {
        let text = text.into();
        let class = self.class(id)?;
        let notify = class.default_signal() == Some(SignalKind::TextChanged);
        self.change(id, SignalKind::TextChanged, |state| {
            if state.text == text {
                return None;
            }
            state.text = text;
            notify.then(|| Payload::Text(state.text.clone()))
        })
    }

    /// Programmatically click a widget.
    ///
    /// Disabled widgets ignore clicks. Checkable widgets flip their checked
    /// state (emitting `toggled`) before `clicked` is emitted. Returns whether
    /// the click happened.
    pub fn click(&self, id: WidgetId) -> WidgetResult<bool> {
        let state = self.state(id)?;
        if !state.enabled {
            return Ok(false);
        }
        if state.checkable {
            self.set_checked(id, !state.checked)?;
        }
        self.signals(id)?.clicked.emit(Payload::None);
        Ok(true)
    }

    /// Apply a toolkit-originated signal: write the carried state, then emit.
    pub fn apply_signal(&self, id: WidgetId, kind: SignalKind, payload: Payload) -> WidgetResult<()> {
        let signals = {
            let mut nodes = self.nodes.write();
            let node = nodes.get_mut(id).ok_or(WidgetError::InvalidWidgetId(id))?;
            store_payload(&mut node.state, kind, &payload);
            Arc::clone(&node.signals)
        };
        signals.get(kind).emit(payload);
        Ok(())
    }

    /// Write the state a payload carries without emitting anything.
    ///
    /// Payloads without state (`Payload::None`) leave the widget untouched.
    pub fn restore_payload(&self, id: WidgetId, payload: &Payload) -> WidgetResult<()> {
        let kind = match payload {
            Payload::None => return self.read(id, |_| ()),
            Payload::Bool(_) => SignalKind::Toggled,
            Payload::Index(_) => SignalKind::IndexChanged,
            Payload::Value(_) => SignalKind::ValueChanged,
            Payload::Text(_) => SignalKind::TextChanged,
        };
        self.write(id, |state| store_payload(state, kind, payload))
    }

    /// The text a widget presents.
    ///
    /// Spin-like widgets show their display-value override if one matches the
    /// current value, otherwise the value formatted with the configured
    /// decimals. Combo boxes and lists show their current item. Other widgets
    /// show their text.
    pub fn display_text(&self, id: WidgetId) -> WidgetResult<String> {
        self.read(id, |node| {
            let state = &node.state;
            if matches!(node.class, WidgetClass::ComboBox | WidgetClass::ListWidget) {
                return usize::try_from(state.index)
                    .ok()
                    .and_then(|index| state.items.get(index))
                    .cloned()
                    .unwrap_or_default();
            }
            if !node.class.is_numeric() {
                return state.text.clone();
            }
            if let Some((_, label)) = state
                .display_values
                .iter()
                .find(|(value, _)| (*value - state.value).abs() < f64::EPSILON)
            {
                return label.clone();
            }
            let decimals = state.limits.map_or(
                if node.class == WidgetClass::SpinBox { 0 } else { 2 },
                |limits| limits.decimals,
            );
            format!("{:.*}", decimals as usize, state.value)
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read<R>(&self, id: WidgetId, f: impl FnOnce(&WidgetNode) -> R) -> WidgetResult<R> {
        let nodes = self.nodes.read();
        nodes.get(id).map(f).ok_or(WidgetError::InvalidWidgetId(id))
    }

    fn write(&self, id: WidgetId, f: impl FnOnce(&mut WidgetState)) -> WidgetResult<()> {
        let mut nodes = self.nodes.write();
        let node = nodes.get_mut(id).ok_or(WidgetError::InvalidWidgetId(id))?;
        f(&mut node.state);
        Ok(())
    }

    /// Mutate state under the lock; emit afterwards if `f` reports a change.
    fn change(
        &self,
        id: WidgetId,
        kind: SignalKind,
        f: impl FnOnce(&mut WidgetState) -> Option<Payload>,
    ) -> WidgetResult<bool> {
        let (payload, signals, changed) = {
            let mut nodes = self.nodes.write();
            let node = nodes.get_mut(id).ok_or(WidgetError::InvalidWidgetId(id))?;
            let before = node.state.clone();
            let payload = f(&mut node.state);
            let changed = node.state != before;
            (payload, Arc::clone(&node.signals), changed)
        };
        if let Some(payload) = payload {
            signals.get(kind).emit(payload);
        }
        Ok(changed)
    }
}

fn store_payload(state: &mut WidgetState, kind: SignalKind, payload: &Payload) {
    match (payload, kind) {
        (Payload::Bool(checked), SignalKind::Toggled) => state.checked = *checked,
        (Payload::Index(index), SignalKind::IndexChanged) => state.index = *index,
        (Payload::Value(value), SignalKind::ValueChanged) => {
            state.value = state.limits.map_or(*value, |limits| limits.clamp(*value));
        }
        (Payload::Text(text), SignalKind::TextChanged) => state.text = text.clone(),
        _ => {}
    }
}

fn scope_of(nodes: &SlotMap<WidgetId, WidgetNode>, id: WidgetId) -> WidgetId {
    let mut current = id;
    loop {
        let node = &nodes[current];
        if node.class.is_scope() {
            return current;
        }
        match node.parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

fn find_in_scope(
    nodes: &SlotMap<WidgetId, WidgetNode>,
    scope: WidgetId,
    name: &str,
) -> Option<WidgetId> {
    let mut stack: Vec<WidgetId> = nodes[scope].children.iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
        let node = &nodes[current];
        if node.name == name {
            return Some(current);
        }
        if !node.class.is_scope() {
            stack.extend(node.children.iter().rev().copied());
        }
    }
    None
}
