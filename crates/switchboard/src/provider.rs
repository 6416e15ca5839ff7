//! Behavior providers and their handler tables.
//!
//! A behavior provider is any `Send + Sync` type whose handlers are listed in
//! a [`HandlerTable`]. The table is normally generated by `#[handlers]`; it
//! can also be built by hand for providers that handle free-form widget
//! names.
//!
//! A panel's resolved provider is a [`PanelProvider`]: an app-specific layer
//! queried first, then the shared base layer. When neither answers, the
//! lookup is a silent miss.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use switchboard_core::Payload;

use crate::context::Switchboard;
use crate::error::HandlerResult;
use crate::host::HostCommands;
use crate::menu::WidgetHandle;
use crate::naming::handler_key;

/// Everything a handler receives about the invocation.
pub struct Call<'a> {
    /// The switchboard context: registry, panels, synchronization, host.
    pub switchboard: &'a Switchboard,
    /// Name of the panel the widget belongs to.
    pub panel: &'a str,
    /// The widget that triggered the call.
    pub widget: WidgetHandle,
    /// The signal payload (`Payload::None` for `_init` and clicks).
    pub payload: Payload,
}

impl<'a> Call<'a> {
    /// The host-application command façade.
    pub fn host(&self) -> &dyn HostCommands {
        self.switchboard.host()
    }

    /// Show a short user-facing message.
    pub fn message_box(&self, text: &str) {
        self.switchboard.message_box(text);
    }

    /// The checked state carried by the payload, else the widget's current one.
    pub fn checked(&self) -> bool {
        match self.payload {
            Payload::Bool(checked) => checked,
            _ => self.widget.state().is_ok_and(|state| state.checked),
        }
    }

    /// The index carried by the payload, else the widget's current one.
    pub fn index(&self) -> i32 {
        match self.payload {
            Payload::Index(index) => index,
            _ => self.widget.state().map_or(-1, |state| state.index),
        }
    }

    /// The value carried by the payload, else the widget's current one.
    pub fn value(&self) -> f64 {
        match self.payload {
            Payload::Value(value) => value,
            _ => self.widget.state().map_or(0.0, |state| state.value),
        }
    }

    /// The text carried by the payload, else the widget's current one.
    pub fn text(&self) -> String {
        match &self.payload {
            Payload::Text(text) => text.clone(),
            _ => self.widget.state().map(|state| state.text).unwrap_or_default(),
        }
    }
}

/// Signature shared by handlers and `_init` constructors.
pub type HandlerFn<P> = fn(&P, &Call<'_>) -> HandlerResult;

struct HandlerEntry<P> {
    invoke: Option<HandlerFn<P>>,
    init: Option<HandlerFn<P>>,
    undoable: bool,
    description: Option<String>,
}

impl<P> Default for HandlerEntry<P> {
    fn default() -> Self {
        Self {
            invoke: None,
            init: None,
            undoable: false,
            description: None,
        }
    }
}

/// Metadata of a registered handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandlerInfo {
    /// Whether the handler runs inside an undo transaction.
    pub undoable: bool,
    /// Human-readable description recorded in the command history.
    pub description: Option<String>,
}

/// Mapping from widget name to `(init, invoke)` for one provider type.
///
/// Convention names are stored and looked up in canonical form
/// ([`handler_key`]), so `b12` and `b012` share one entry.
///
/// ```
/// use switchboard::{Call, HandlerResult, HandlerTable};
///
/// struct Tools;
///
/// fn ok_clicked(_: &Tools, _: &Call<'_>) -> HandlerResult {
///     Ok(())
/// }
///
/// let table = HandlerTable::<Tools>::new()
///     .handler("okButton", ok_clicked)
///     .describe("okButton", "Confirm");
/// assert!(table.contains("okButton"));
/// ```
pub struct HandlerTable<P> {
    entries: HashMap<String, HandlerEntry<P>>,
}

impl<P> Default for HandlerTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for HandlerTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("HandlerTable").field("names", &names).finish()
    }
}

impl<P> HandlerTable<P> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register the handler invoked for `name`.
    pub fn handler(mut self, name: impl Into<String>, f: HandlerFn<P>) -> Self {
        self.slot(name.into()).invoke = Some(f);
        self
    }

    /// Register the lazy constructor paired with `name`.
    pub fn init(mut self, name: impl Into<String>, f: HandlerFn<P>) -> Self {
        self.slot(name.into()).init = Some(f);
        self
    }

    /// Set the history description of `name`.
    pub fn describe(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.slot(name.into()).description = Some(description.into());
        self
    }

    /// Run `name` inside an undo transaction.
    pub fn undoable(mut self, name: impl Into<String>) -> Self {
        self.slot(name.into()).undoable = true;
        self
    }

    /// Whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| entry.invoke.is_some())
    }

    /// Whether a `_init` constructor is registered for `name`.
    pub fn contains_init(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| entry.init.is_some())
    }

    /// Number of names with a handler or constructor.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&mut self, name: String) -> &mut HandlerEntry<P> {
        let key = handler_key(&name).into_owned();
        self.entries.entry(key).or_default()
    }

    fn entry(&self, name: &str) -> Option<&HandlerEntry<P>> {
        self.entries.get(handler_key(name).as_ref())
    }

    fn info(&self, name: &str) -> Option<HandlerInfo> {
        let entry = self.entry(name)?;
        entry.invoke.map(|_| HandlerInfo {
            undoable: entry.undoable,
            description: entry.description.clone(),
        })
    }
}

/// Types that expose a handler table.
///
/// Implemented by `#[handlers]`; implement it by hand to register handlers
/// with the [`HandlerTable`] builder.
pub trait Handlers: Send + Sync + 'static {
    /// Build the handler table of this provider type.
    fn handler_table() -> HandlerTable<Self>
    where
        Self: Sized;
}

trait DynProvider: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn info(&self, name: &str) -> Option<HandlerInfo>;
    fn has_init(&self, name: &str) -> bool;
    fn call_invoke(&self, name: &str, call: &Call<'_>) -> Option<HandlerResult>;
    fn call_init(&self, name: &str, call: &Call<'_>) -> Option<HandlerResult>;
    fn as_any(&self) -> &dyn Any;
}

struct Bound<P> {
    provider: P,
    table: HandlerTable<P>,
}

impl<P: Send + Sync + 'static> DynProvider for Bound<P> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn info(&self, name: &str) -> Option<HandlerInfo> {
        self.table.info(name)
    }

    fn has_init(&self, name: &str) -> bool {
        self.table.contains_init(name)
    }

    fn call_invoke(&self, name: &str, call: &Call<'_>) -> Option<HandlerResult> {
        let f = self.table.entry(name)?.invoke?;
        Some(f(&self.provider, call))
    }

    fn call_init(&self, name: &str, call: &Call<'_>) -> Option<HandlerResult> {
        let f = self.table.entry(name)?.init?;
        Some(f(&self.provider, call))
    }

    fn as_any(&self) -> &dyn Any {
        &self.provider
    }
}

/// The degenerate provider with no handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProvider;

impl Handlers for NoopProvider {
    fn handler_table() -> HandlerTable<Self> {
        HandlerTable::new()
    }
}

/// A constructed, type-erased behavior provider.
#[derive(Clone)]
pub struct ProviderInstance {
    inner: Arc<dyn DynProvider>,
}

impl fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderInstance")
            .field(&self.inner.type_name())
            .finish()
    }
}

impl ProviderInstance {
    /// Wrap a provider using its generated handler table.
    pub fn new<P: Handlers>(provider: P) -> Self {
        Self::with_table(provider, P::handler_table())
    }

    /// Wrap a provider with an explicit handler table.
    pub fn with_table<P: Send + Sync + 'static>(provider: P, table: HandlerTable<P>) -> Self {
        Self {
            inner: Arc::new(Bound { provider, table }),
        }
    }

    /// The no-op provider.
    pub fn noop() -> Self {
        Self::new(NoopProvider)
    }

    /// Type name of the wrapped provider.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Borrow the wrapped provider as `P`.
    pub fn downcast_ref<P: 'static>(&self) -> Option<&P> {
        self.inner.as_any().downcast_ref()
    }

    /// Whether both handles point to the same instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Metadata of the handler registered for `name`.
    pub fn handler_info(&self, name: &str) -> Option<HandlerInfo> {
        self.inner.info(name)
    }

    /// Whether a `_init` constructor is registered for `name`.
    pub fn has_init(&self, name: &str) -> bool {
        self.inner.has_init(name)
    }

    pub(crate) fn call_invoke(&self, name: &str, call: &Call<'_>) -> Option<HandlerResult> {
        self.inner.call_invoke(name, call)
    }

    pub(crate) fn call_init(&self, name: &str, call: &Call<'_>) -> Option<HandlerResult> {
        self.inner.call_init(name, call)
    }
}

/// Which layer of a [`PanelProvider`] answered a lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    /// The host-application specific provider.
    App,
    /// The shared cross-host-application provider.
    Base,
}

/// A handler found by [`PanelProvider::resolve`].
#[derive(Debug)]
pub struct Resolved<'a> {
    /// The answering layer.
    pub layer: Layer,
    /// The answering provider.
    pub provider: &'a ProviderInstance,
    /// Handler metadata.
    pub info: HandlerInfo,
}

/// The provider of one `(panel, host_app)` key.
#[derive(Debug)]
pub struct PanelProvider {
    panel: String,
    host_app: String,
    app: Option<ProviderInstance>,
    base: Option<ProviderInstance>,
}

impl PanelProvider {
    pub(crate) fn new(
        panel: impl Into<String>,
        host_app: impl Into<String>,
        app: Option<ProviderInstance>,
        base: Option<ProviderInstance>,
    ) -> Self {
        Self {
            panel: panel.into(),
            host_app: host_app.into(),
            app,
            base,
        }
    }

    pub(crate) fn noop(panel: impl Into<String>, host_app: impl Into<String>) -> Self {
        Self::new(panel, host_app, None, None)
    }

    /// The panel name.
    pub fn panel(&self) -> &str {
        &self.panel
    }

    /// The host application this provider was resolved for.
    pub fn host_app(&self) -> &str {
        &self.host_app
    }

    /// The app-specific layer.
    pub fn app(&self) -> Option<&ProviderInstance> {
        self.app.as_ref()
    }

    /// The shared base layer.
    pub fn base(&self) -> Option<&ProviderInstance> {
        self.base.as_ref()
    }

    /// Whether neither layer exists.
    pub fn is_noop(&self) -> bool {
        self.app.is_none() && self.base.is_none()
    }

    fn layers(&self) -> impl Iterator<Item = (Layer, &ProviderInstance)> {
        self.app
            .iter()
            .map(|p| (Layer::App, p))
            .chain(self.base.iter().map(|p| (Layer::Base, p)))
    }

    /// Find the handler for `name`: app layer first, then base.
    pub fn resolve(&self, name: &str) -> Option<Resolved<'_>> {
        self.layers().find_map(|(layer, provider)| {
            provider.handler_info(name).map(|info| Resolved {
                layer,
                provider,
                info,
            })
        })
    }

    /// Find the `_init` constructor for `name`: app layer first, then base.
    pub fn resolve_init(&self, name: &str) -> Option<(Layer, &ProviderInstance)> {
        self.layers().find(|(_, provider)| provider.has_init(name))
    }

    /// Borrow the first layer whose provider is a `P`.
    pub fn downcast_ref<P: 'static>(&self) -> Option<&P> {
        self.layers().find_map(|(_, provider)| provider.downcast_ref())
    }
}
