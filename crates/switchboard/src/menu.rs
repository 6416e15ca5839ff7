//! Menu and option-box construction.
//!
//! Every widget kind has a typed configuration struct. A configuration is an
//! ordered list of settings: builder calls are recorded in call order and
//! applied in that order when [`Menu::add`] constructs the widget, so one
//! call both creates and fully configures it.
//!
//! ```
//! use std::sync::Arc;
//! use switchboard::menu::{CheckBox, DoubleSpinBox, Menu};
//! use switchboard_core::{WidgetClass, WidgetTree};
//!
//! let tree = Arc::new(WidgetTree::new());
//! let root = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
//! let menu = Menu::new(tree.clone(), root);
//!
//! menu.add(CheckBox::new().object_name("chk000").text("Merge UVs").checked(true))
//!     .unwrap();
//! let spin = menu
//!     .add(
//!         DoubleSpinBox::new()
//!             .object_name("s000")
//!             .limits(-1.0, 10.0, 0.5, 1)
//!             .custom_display_values([(-1.0, "Auto")])
//!             .value(-1.0),
//!     )
//!     .unwrap();
//! assert_eq!(spin.display_text().unwrap(), "Auto");
//! ```

use std::fmt;
use std::sync::Arc;

use switchboard_core::{
    ConnectionId, Limits, MenuSlot, Payload, SignalKind, WidgetClass, WidgetId, WidgetResult,
    WidgetState, WidgetTree,
};

use crate::error::{Result, SwitchboardError};

/// One recorded configuration step.
#[derive(Clone, Debug, PartialEq)]
pub enum Setting {
    /// Object name the resolver keys on.
    ObjectName(String),
    /// Display text.
    Text(String),
    /// Tool tip.
    ToolTip(String),
    /// Enabled state.
    Enabled(bool),
    /// Visibility.
    Visible(bool),
    /// Checkable flag.
    Checkable(bool),
    /// Checked state.
    Checked(bool),
    /// Items of a combo box or list.
    Items(Vec<String>),
    /// Current index.
    Index(i32),
    /// Numeric range.
    Limits(Limits),
    /// Sparse value to label overrides.
    DisplayValues(Vec<(f64, String)>),
    /// Numeric value.
    Value(f64),
}

impl Setting {
    fn apply(self, tree: &WidgetTree, id: WidgetId) -> WidgetResult<()> {
        match self {
            Setting::ObjectName(name) => tree.set_name(id, name),
            Setting::Text(text) => tree.set_text(id, text).map(drop),
            Setting::ToolTip(tip) => tree.set_tool_tip(id, tip),
            Setting::Enabled(enabled) => tree.set_enabled(id, enabled),
            Setting::Visible(visible) => tree.set_visible(id, visible),
            Setting::Checkable(checkable) => tree.set_checkable(id, checkable),
            Setting::Checked(checked) => tree.set_checked(id, checked).map(drop),
            Setting::Items(items) => tree.set_items(id, items),
            Setting::Index(index) => tree.set_index(id, index).map(drop),
            Setting::Limits(limits) => tree.set_limits(id, limits),
            Setting::DisplayValues(values) => tree.set_display_values(id, values),
            Setting::Value(value) => tree.set_value(id, value).map(drop),
        }
    }
}

/// A typed widget configuration.
pub trait WidgetConfig {
    /// The class of the widget to construct.
    fn class(&self) -> WidgetClass;

    /// The recorded settings, in application order.
    fn into_settings(self) -> Vec<Setting>;
}

macro_rules! widget_config {
    ($(#[$meta:meta])* $name:ident => $class:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default)]
        pub struct $name {
            settings: Vec<Setting>,
        }

        impl $name {
            /// Start an empty configuration.
            pub fn new() -> Self {
                Self::default()
            }

            fn push(mut self, setting: Setting) -> Self {
                self.settings.push(setting);
                self
            }

            /// Set the object name.
            pub fn object_name(self, name: impl Into<String>) -> Self {
                self.push(Setting::ObjectName(name.into()))
            }

            /// Set the tool tip.
            pub fn tool_tip(self, tip: impl Into<String>) -> Self {
                self.push(Setting::ToolTip(tip.into()))
            }

            /// Enable or disable the widget.
            pub fn enabled(self, enabled: bool) -> Self {
                self.push(Setting::Enabled(enabled))
            }

            /// Show or hide the widget.
            pub fn visible(self, visible: bool) -> Self {
                self.push(Setting::Visible(visible))
            }
        }

        impl WidgetConfig for $name {
            fn class(&self) -> WidgetClass {
                $class
            }

            fn into_settings(self) -> Vec<Setting> {
                self.settings
            }
        }
    };
}

macro_rules! text_setting {
    ($($name:ident),*) => {$(
        impl $name {
            /// Set the display text.
            pub fn text(self, text: impl Into<String>) -> Self {
                self.push(Setting::Text(text.into()))
            }
        }
    )*};
}

macro_rules! check_settings {
    ($($name:ident),*) => {$(
        impl $name {
            /// Make the widget checkable.
            pub fn checkable(self, checkable: bool) -> Self {
                self.push(Setting::Checkable(checkable))
            }

            /// Set the checked state (makes the widget checkable first).
            pub fn checked(self, checked: bool) -> Self {
                self.push(Setting::Checkable(true)).push(Setting::Checked(checked))
            }
        }
    )*};
}

macro_rules! item_settings {
    ($($name:ident),*) => {$(
        impl $name {
            /// Set the items.
            pub fn items<I, S>(self, items: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.push(Setting::Items(items.into_iter().map(Into::into).collect()))
            }

            /// Set the current index.
            pub fn index(self, index: i32) -> Self {
                self.push(Setting::Index(index))
            }
        }
    )*};
}

macro_rules! numeric_settings {
    ($($name:ident),*) => {$(
        impl $name {
            /// Set the current value (clamped to the limits).
            pub fn value(self, value: f64) -> Self {
                self.push(Setting::Value(value))
            }

            /// Show `label` instead of the number for each listed value.
            pub fn custom_display_values<I, S>(self, values: I) -> Self
            where
                I: IntoIterator<Item = (f64, S)>,
                S: Into<String>,
            {
                self.push(Setting::DisplayValues(
                    values.into_iter().map(|(v, label)| (v, label.into())).collect(),
                ))
            }
        }
    )*};
}

widget_config!(
    /// A plain push button.
    PushButton => WidgetClass::PushButton
);
widget_config!(
    /// A tool button, usually opening an option menu.
    ToolButton => WidgetClass::ToolButton
);
widget_config!(
    /// A text label.
    Label => WidgetClass::Label
);
widget_config!(
    /// A check box.
    CheckBox => WidgetClass::CheckBox
);
widget_config!(
    /// A radio button.
    RadioButton => WidgetClass::RadioButton
);
widget_config!(
    /// A drop-down selection.
    ComboBox => WidgetClass::ComboBox
);
widget_config!(
    /// An integer spin box.
    SpinBox => WidgetClass::SpinBox
);
widget_config!(
    /// A floating point spin box.
    DoubleSpinBox => WidgetClass::DoubleSpinBox
);
widget_config!(
    /// A single line text entry.
    LineEdit => WidgetClass::LineEdit
);
widget_config!(
    /// A list of items.
    ListWidget => WidgetClass::ListWidget
);
widget_config!(
    /// A separator line.
    Separator => WidgetClass::Separator
);

text_setting!(PushButton, ToolButton, Label, CheckBox, RadioButton, LineEdit);
check_settings!(PushButton, ToolButton, CheckBox, RadioButton);
item_settings!(ComboBox, ListWidget);
numeric_settings!(SpinBox, DoubleSpinBox);

impl SpinBox {
    /// Set the integer range and step.
    pub fn limits(self, min: i64, max: i64, step: i64) -> Self {
        self.push(Setting::Limits(Limits::new(min as f64, max as f64, step as f64, 0)))
    }
}

impl DoubleSpinBox {
    /// Set the range, step and shown decimals.
    pub fn limits(self, min: f64, max: f64, step: f64, decimals: u32) -> Self {
        self.push(Setting::Limits(Limits::new(min, max, step, decimals)))
    }
}

/// Configuration for an explicitly chosen class, or a symbolic tag via
/// [`Menu::add_tag`]. Accepts every setting.
#[derive(Clone, Debug)]
pub struct Generic {
    class: WidgetClass,
    settings: Vec<Setting>,
}

impl Default for Generic {
    fn default() -> Self {
        Self::of(WidgetClass::Container)
    }
}

impl Generic {
    /// Configure a widget of the given class.
    pub fn of(class: WidgetClass) -> Self {
        Self {
            class,
            settings: Vec::new(),
        }
    }

    /// Append any setting.
    pub fn with(mut self, setting: Setting) -> Self {
        self.settings.push(setting);
        self
    }

    /// Set the object name.
    pub fn object_name(self, name: impl Into<String>) -> Self {
        self.with(Setting::ObjectName(name.into()))
    }

    /// Set the tool tip.
    pub fn tool_tip(self, tip: impl Into<String>) -> Self {
        self.with(Setting::ToolTip(tip.into()))
    }

    /// Set the display text.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.with(Setting::Text(text.into()))
    }

    /// Enable or disable the widget.
    pub fn enabled(self, enabled: bool) -> Self {
        self.with(Setting::Enabled(enabled))
    }
}

impl WidgetConfig for Generic {
    fn class(&self) -> WidgetClass {
        self.class
    }

    fn into_settings(self) -> Vec<Setting> {
        self.settings
    }
}

// ============================================================================
// Menu
// ============================================================================

/// A panel root, menu, option menu or context menu that widgets are added to.
#[derive(Clone)]
pub struct Menu {
    tree: Arc<WidgetTree>,
    id: WidgetId,
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu").field("id", &self.id).finish()
    }
}

impl Menu {
    /// Address an existing node as a menu.
    pub fn new(tree: Arc<WidgetTree>, id: WidgetId) -> Self {
        Self { tree, id }
    }

    /// The menu's node id.
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// The tree the menu lives in.
    pub fn tree(&self) -> &Arc<WidgetTree> {
        &self.tree
    }

    /// Handle to the menu node itself.
    pub fn handle(&self) -> WidgetHandle {
        WidgetHandle::new(Arc::clone(&self.tree), self.id)
    }

    /// Construct and configure a widget in one call.
    ///
    /// Settings apply in recorded order; if one fails the half-built widget
    /// is removed again.
    pub fn add<C: WidgetConfig>(&self, config: C) -> Result<WidgetHandle> {
        let class = config.class();
        self.build(class, config.into_settings())
    }

    /// Construct a widget whose class is given by a symbolic tag.
    pub fn add_tag(&self, tag: &str, config: Generic) -> Result<WidgetHandle> {
        let class = WidgetClass::from_tag(tag)?;
        self.build(class, config.into_settings())
    }

    /// Add a nested menu with a title.
    pub fn add_menu(&self, title: impl Into<String>) -> Result<Menu> {
        let handle = self.build(WidgetClass::Menu, vec![Setting::Text(title.into())])?;
        Ok(Menu::new(Arc::clone(&self.tree), handle.id))
    }

    /// Add a separator.
    pub fn add_separator(&self) -> Result<WidgetHandle> {
        self.add(Separator::new())
    }

    /// Direct children, in insertion order.
    pub fn widgets(&self) -> Result<Vec<WidgetHandle>> {
        Ok(self
            .tree
            .children(self.id)?
            .into_iter()
            .map(|id| WidgetHandle::new(Arc::clone(&self.tree), id))
            .collect())
    }

    /// Find a descendant by object name.
    pub fn find(&self, name: &str) -> Result<WidgetHandle> {
        match self.tree.find_descendant(self.id, name)? {
            Some(id) => Ok(WidgetHandle::new(Arc::clone(&self.tree), id)),
            None => Err(SwitchboardError::UnknownWidget {
                scope: self.tree.name(self.id)?,
                name: name.to_string(),
            }),
        }
    }

    fn build(&self, class: WidgetClass, settings: Vec<Setting>) -> Result<WidgetHandle> {
        let id = self.tree.insert(Some(self.id), class, "")?;
        for setting in settings {
            if let Err(err) = setting.apply(&self.tree, id) {
                if let Err(cleanup) = self.tree.destroy(id) {
                    tracing::warn!(target: "switchboard", error = %cleanup, "failed to discard half-built widget");
                }
                return Err(err.into());
            }
        }
        Ok(WidgetHandle::new(Arc::clone(&self.tree), id))
    }
}

// ============================================================================
// Widget handle
// ============================================================================

/// A constructed widget, for immediate further wiring.
#[derive(Clone)]
pub struct WidgetHandle {
    tree: Arc<WidgetTree>,
    id: WidgetId,
}

impl fmt::Debug for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetHandle")
            .field("id", &self.id)
            .field("name", &self.tree.name(self.id).unwrap_or_default())
            .finish()
    }
}

impl PartialEq for WidgetHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.tree, &other.tree)
    }
}

impl WidgetHandle {
    /// Address an existing node.
    pub fn new(tree: Arc<WidgetTree>, id: WidgetId) -> Self {
        Self { tree, id }
    }

    /// The node id.
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// The tree the widget lives in.
    pub fn tree(&self) -> &Arc<WidgetTree> {
        &self.tree
    }

    /// Whether the widget still exists.
    pub fn is_alive(&self) -> bool {
        self.tree.contains(self.id)
    }

    /// The object name.
    pub fn name(&self) -> Result<String> {
        Ok(self.tree.name(self.id)?)
    }

    /// The widget class.
    pub fn class(&self) -> Result<WidgetClass> {
        Ok(self.tree.class(self.id)?)
    }

    /// Snapshot of the widget state.
    pub fn state(&self) -> Result<WidgetState> {
        Ok(self.tree.state(self.id)?)
    }

    /// The shown text (honors display-value overrides).
    pub fn display_text(&self) -> Result<String> {
        Ok(self.tree.display_text(self.id)?)
    }

    /// Set the checked state.
    pub fn set_checked(&self, checked: bool) -> Result<()> {
        self.tree.set_checked(self.id, checked)?;
        Ok(())
    }

    /// Enable or disable the widget.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        Ok(self.tree.set_enabled(self.id, enabled)?)
    }

    /// Show or hide the widget.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        Ok(self.tree.set_visible(self.id, visible)?)
    }

    /// Set the numeric value.
    pub fn set_value(&self, value: f64) -> Result<()> {
        self.tree.set_value(self.id, value)?;
        Ok(())
    }

    /// Set the current index.
    pub fn set_index(&self, index: i32) -> Result<()> {
        self.tree.set_index(self.id, index)?;
        Ok(())
    }

    /// Set the text.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.tree.set_text(self.id, text)?;
        Ok(())
    }

    /// Replace the items.
    pub fn set_items<I, S>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.tree.set_items(self.id, items)?)
    }

    /// Set the tool tip.
    pub fn set_tool_tip(&self, tip: impl Into<String>) -> Result<()> {
        Ok(self.tree.set_tool_tip(self.id, tip)?)
    }

    /// Click the widget programmatically.
    pub fn click(&self) -> Result<bool> {
        Ok(self.tree.click(self.id)?)
    }

    /// Connect a slot to one of the widget's signals.
    pub fn connect<F>(&self, kind: SignalKind, slot: F) -> Result<ConnectionId>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        Ok(self.tree.signals(self.id)?.get(kind).connect(slot))
    }

    /// Disconnect a slot connected with [`connect`](Self::connect).
    pub fn disconnect(&self, kind: SignalKind, connection: ConnectionId) -> Result<bool> {
        Ok(self.tree.signals(self.id)?.get(kind).disconnect(connection))
    }

    /// The option menu of this widget, created empty on first use.
    pub fn option_menu(&self) -> Result<Menu> {
        let id = self.tree.ensure_attached_menu(self.id, MenuSlot::Option)?;
        Ok(Menu::new(Arc::clone(&self.tree), id))
    }

    /// The context menu of this widget, created empty on first use.
    pub fn context_menu(&self) -> Result<Menu> {
        let id = self.tree.ensure_attached_menu(self.id, MenuSlot::Context)?;
        Ok(Menu::new(Arc::clone(&self.tree), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn root() -> Menu {
        let tree = Arc::new(WidgetTree::new());
        let id = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
        Menu::new(tree, id)
    }

    #[test]
    fn test_add_configures_in_order() {
        let menu = root();
        // Value before limits is clamped by the later limits.
        let spin = menu
            .add(SpinBox::new().object_name("s000").value(50.0).limits(0, 10, 1))
            .unwrap();
        assert_eq!(spin.state().unwrap().value, 10.0);
        assert_eq!(spin.display_text().unwrap(), "10");

        let spin = menu
            .add(SpinBox::new().object_name("s001").limits(0, 10, 1).value(5.0))
            .unwrap();
        assert_eq!(spin.state().unwrap().value, 5.0);
    }

    #[test]
    fn test_common_settings() {
        let menu = root();
        let button = menu
            .add(
                ToolButton::new()
                    .object_name("tb000")
                    .text("Bevel")
                    .tool_tip("Bevel selected edges")
                    .enabled(false),
            )
            .unwrap();
        let state = button.state().unwrap();
        assert_eq!(button.name().unwrap(), "tb000");
        assert_eq!(state.text, "Bevel");
        assert_eq!(state.tool_tip, "Bevel selected edges");
        assert!(!state.enabled);
        assert_eq!(button.class().unwrap(), WidgetClass::ToolButton);
    }

    #[test]
    fn test_duplicate_name_rolls_back() {
        let menu = root();
        menu.add(CheckBox::new().object_name("chk000")).unwrap();
        let discarded = Arc::new(Mutex::new(Vec::new()));
        let sink = discarded.clone();
        menu.tree
            .destroyed()
            .connect(move |ids: &Vec<WidgetId>| sink.lock().extend(ids.iter().copied()));

        let err = menu.add(RadioButton::new().object_name("chk000")).unwrap_err();
        assert!(matches!(err, SwitchboardError::Widget(_)));
        assert_eq!(menu.widgets().unwrap().len(), 1);
        assert_eq!(discarded.lock().len(), 1);
        assert_eq!(menu.tree.node_count(), 2);
    }

    #[test]
    fn test_add_tag_and_generic() {
        let menu = root();
        let combo = menu
            .add_tag("QComboBox", Generic::of(WidgetClass::Container).object_name("cmb000"))
            .unwrap();
        assert_eq!(combo.class().unwrap(), WidgetClass::ComboBox);

        let edit = menu
            .add(Generic::of(WidgetClass::LineEdit).object_name("txt000").text("abc"))
            .unwrap();
        assert_eq!(edit.state().unwrap().text, "abc");

        assert!(menu.add_tag("QDial", Generic::default()).is_err());
    }

    #[test]
    fn test_nested_menus_and_option_menu() {
        let menu = root();
        let sub = menu.add_menu("More").unwrap();
        let nested = sub.add_menu("Even more").unwrap();
        nested.add(PushButton::new().object_name("b000")).unwrap();
        assert!(menu.find("b000").is_ok());

        let tb = menu.add(ToolButton::new().object_name("tb000")).unwrap();
        let options = tb.option_menu().unwrap();
        assert_eq!(options.id(), tb.option_menu().unwrap().id());
        options.add(CheckBox::new().object_name("chk000")).unwrap();
        assert!(menu.find("chk000").is_ok());
        assert!(matches!(
            menu.find("chk999"),
            Err(SwitchboardError::UnknownWidget { .. })
        ));
    }

    #[test]
    fn test_handle_connect_wiring() {
        let menu = root();
        let combo = menu
            .add(ComboBox::new().object_name("cmb000").items(["a", "b", "c"]))
            .unwrap();
        assert_eq!(combo.state().unwrap().index, 0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let conn = combo
            .connect(SignalKind::IndexChanged, move |p| seen_clone.lock().push(p.clone()))
            .unwrap();
        combo.set_index(2).unwrap();
        assert!(combo.disconnect(SignalKind::IndexChanged, conn).unwrap());
        combo.set_index(1).unwrap();
        assert_eq!(*seen.lock(), vec![Payload::Index(2)]);
    }

    #[test]
    fn test_checked_makes_checkable() {
        let menu = root();
        let button = menu
            .add(PushButton::new().object_name("b000").checked(true))
            .unwrap();
        let state = button.state().unwrap();
        assert!(state.checkable && state.checked);
    }
}
