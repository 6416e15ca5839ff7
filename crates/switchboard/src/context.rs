//! The switchboard context.
//!
//! A [`Switchboard`] is created once at plugin start and handed by reference
//! to every behavior provider. It owns the widget tree, the provider
//! registry, panel layouts, the dispatcher's slot table, the command history
//! and the undo transaction manager. There is no ambient global: everything
//! a provider needs is reachable from the `&Switchboard` in its
//! [`Call`](crate::Call).
//!
//! ```
//! use switchboard::prelude::*;
//!
//! let sb = Switchboard::new(SwitchboardConfig::default().with_host_app("maya"));
//! sb.register_layout("edit", |menu| {
//!     menu.add(PushButton::new().object_name("b000").text("Delete history"))?;
//!     Ok(())
//! });
//! let panel = sb.panel("edit").unwrap();
//! assert!(panel.find("b000").is_ok());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use slotmap::SecondaryMap;
use switchboard_core::{ConnectionId, SignalKind, ThreadAffinity, UiQueue, WidgetId, WidgetTree};

use crate::config::SwitchboardConfig;
use crate::error::{ProviderError, Result};
use crate::history::CommandHistory;
use crate::host::{HostCommands, NullHost};
use crate::lifecycle::{Lifecycle, LifecyclePhase};
use crate::menu::{Menu, WidgetHandle};
use crate::message::{LogMessages, MessageSink};
use crate::provider::{Handlers, PanelProvider, ProviderInstance};
use crate::registry::Registry;
use crate::sync::{ButtonGroup, SyncAttr, SyncLink, ToggleMulti, ToggleRule, create_button_groups};
use crate::transaction::TransactionManager;

/// A panel layout: builds the panel's widgets into its root menu.
pub type LayoutFn = Arc<dyn Fn(&Menu) -> Result<()> + Send + Sync>;

/// A dispatcher slot: the handler a widget's signal is routed to.
#[derive(Clone, Debug)]
pub(crate) struct Binding {
    pub(crate) panel: String,
    pub(crate) handler: String,
    pub(crate) signal: SignalKind,
    pub(crate) connection: ConnectionId,
}

/// The shared context of one plugin session.
pub struct Switchboard {
    /// Self reference handed to signal slots.
    pub(crate) this: Weak<Switchboard>,
    /// Session configuration.
    pub(crate) config: SwitchboardConfig,
    /// Retained widget nodes of every panel.
    pub(crate) tree: Arc<WidgetTree>,
    /// Memoized behavior providers.
    pub(crate) registry: Registry,
    /// Registered panel builders.
    pub(crate) layouts: RwLock<HashMap<String, LayoutFn>>,
    /// Instantiated panel roots.
    pub(crate) panels: Mutex<HashMap<String, WidgetId>>,
    /// Widget to handler routing.
    pub(crate) bindings: Mutex<SecondaryMap<WidgetId, Binding>>,
    /// `_init` bookkeeping.
    pub(crate) lifecycle: Lifecycle,
    /// Successful invocations.
    pub(crate) history: CommandHistory,
    /// Undo chunk nesting.
    pub(crate) transactions: TransactionManager,
    /// Host-application command façade.
    pub(crate) host: Arc<dyn HostCommands>,
    /// User-facing message facility.
    pub(crate) messages: Arc<dyn MessageSink>,
    /// The UI thread.
    pub(crate) affinity: ThreadAffinity,
    /// Work posted from worker threads.
    pub(crate) ui_queue: UiQueue,
    /// Button groups kept alive for the session.
    pub(crate) groups: Mutex<Vec<Arc<ButtonGroup>>>,
    /// Connection to the tree's `destroyed` signal.
    pruning: ConnectionId,
}

static_assertions::assert_impl_all!(Switchboard: Send, Sync);

impl fmt::Debug for Switchboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switchboard")
            .field("host_app", &self.config.host_app)
            .field("panels", &self.panels.lock().len())
            .field("bindings", &self.bindings.lock().len())
            .field("history", &self.history)
            .finish()
    }
}

/// Builder for a [`Switchboard`] with custom collaborators.
pub struct SwitchboardBuilder {
    config: SwitchboardConfig,
    host: Arc<dyn HostCommands>,
    messages: Arc<dyn MessageSink>,
    tree: Option<Arc<WidgetTree>>,
}

impl Default for SwitchboardBuilder {
    fn default() -> Self {
        Self {
            config: SwitchboardConfig::default(),
            host: Arc::new(NullHost),
            messages: Arc::new(LogMessages),
            tree: None,
        }
    }
}

impl SwitchboardBuilder {
    /// Use this configuration.
    pub fn config(mut self, config: SwitchboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this host command façade.
    pub fn host(mut self, host: Arc<dyn HostCommands>) -> Self {
        self.host = host;
        self
    }

    /// Use this message facility.
    pub fn messages(mut self, messages: Arc<dyn MessageSink>) -> Self {
        self.messages = messages;
        self
    }

    /// Share an existing widget tree.
    pub fn tree(mut self, tree: Arc<WidgetTree>) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Create the switchboard, binding it to the calling (UI) thread.
    pub fn build(self) -> Arc<Switchboard> {
        let SwitchboardBuilder {
            config,
            host,
            messages,
            tree,
        } = self;
        tracing::debug!(target: "switchboard", host_app = %config.host_app, "creating switchboard");
        let tree: Arc<WidgetTree> = tree.unwrap_or_default();
        Arc::new_cyclic(|this| {
            let weak: Weak<Switchboard> = this.clone();
            let pruning = tree.destroyed().connect(move |ids| {
                if let Some(switchboard) = weak.upgrade() {
                    switchboard.forget_widgets(ids);
                }
            });
            Switchboard {
                this: this.clone(),
                tree,
                registry: Registry::new(),
                layouts: RwLock::new(HashMap::new()),
                panels: Mutex::new(HashMap::new()),
                bindings: Mutex::new(SecondaryMap::new()),
                lifecycle: Lifecycle::default(),
                history: CommandHistory::new(config.history.capacity),
                transactions: TransactionManager::new(Arc::clone(&host)),
                host,
                messages,
                affinity: ThreadAffinity::current(config.thread_checks),
                ui_queue: UiQueue::new(),
                groups: Mutex::new(Vec::new()),
                pruning,
                config,
            }
        })
    }
}

impl Drop for Switchboard {
    fn drop(&mut self) {
        self.tree.destroyed().disconnect(self.pruning);
    }
}

impl Switchboard {
    /// Create a switchboard with the default host and message facility.
    pub fn new(config: SwitchboardConfig) -> Arc<Self> {
        Self::builder().config(config).build()
    }

    /// Start building a switchboard.
    pub fn builder() -> SwitchboardBuilder {
        SwitchboardBuilder::default()
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// The session configuration.
    pub fn config(&self) -> &SwitchboardConfig {
        &self.config
    }

    /// The active host-application variant.
    pub fn host_app(&self) -> &str {
        &self.config.host_app
    }

    /// The widget tree.
    pub fn tree(&self) -> &Arc<WidgetTree> {
        &self.tree
    }

    /// The host-application command façade.
    pub fn host(&self) -> &dyn HostCommands {
        self.host.as_ref()
    }

    /// Show a short user-facing message.
    pub fn message_box(&self, text: &str) {
        self.messages.message_box(text);
    }

    /// The command history.
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// The undo transaction manager.
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Run `f` inside one host undo chunk.
    pub fn as_transaction<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        self.transactions.as_transaction(name, f)
    }

    /// The queue worker threads post widget updates to.
    pub fn ui_queue(&self) -> &UiQueue {
        &self.ui_queue
    }

    /// Run every update posted by worker threads. Returns how many ran.
    pub fn process_ui_queue(&self) -> usize {
        self.check_thread("process_ui_queue");
        self.ui_queue.drain()
    }

    /// A handle to a widget of this switchboard's tree.
    pub fn handle(&self, widget: WidgetId) -> WidgetHandle {
        WidgetHandle::new(Arc::clone(&self.tree), widget)
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// The provider registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a provider constructor for `panel`.
    ///
    /// `host_app = None` registers the shared base provider.
    pub fn register_provider<P, F>(&self, panel: &str, host_app: Option<&str>, ctor: F)
    where
        P: Handlers,
        F: Fn(&Switchboard) -> std::result::Result<P, ProviderError> + Send + Sync + 'static,
    {
        self.registry.register(panel, host_app, ctor);
    }

    /// Register a constructor producing a ready [`ProviderInstance`].
    pub fn register_provider_instance<F>(&self, panel: &str, host_app: Option<&str>, ctor: F)
    where
        F: Fn(&Switchboard) -> std::result::Result<ProviderInstance, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register_erased(panel, host_app, ctor);
    }

    /// The memoized provider of `(panel, host_app)`.
    pub fn get_provider(&self, panel: &str, host_app: &str) -> Arc<PanelProvider> {
        self.registry.get_or_create(self, panel, host_app)
    }

    /// The provider of `panel` for the configured host application.
    pub fn provider(&self, panel: &str) -> Arc<PanelProvider> {
        self.get_provider(panel, &self.config.host_app)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Lifecycle phase of a widget.
    pub fn phase(&self, widget: WidgetId) -> LifecyclePhase {
        self.lifecycle.phase(widget)
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Install a synchronization rule on this switchboard's tree.
    pub fn toggle_multi(&self, rule: ToggleMulti) -> Result<ToggleRule> {
        rule.install(&self.tree)
    }

    /// Make each range of widgets below `container` mutually exclusive.
    ///
    /// The groups stay alive for the session.
    pub fn create_button_groups<S: AsRef<str>>(
        &self,
        container: WidgetId,
        ranges: &[S],
        allow_deselect: bool,
    ) -> Result<Vec<Arc<ButtonGroup>>> {
        let groups = create_button_groups(&self.tree, container, ranges, allow_deselect)?;
        self.groups.lock().extend(groups.iter().cloned());
        Ok(groups)
    }

    /// Mirror `attr` between two widgets, usually in different panels.
    pub fn sync_widgets(&self, a: WidgetId, b: WidgetId, attr: SyncAttr) -> Result<SyncLink> {
        SyncLink::new(&self.tree, a, b, attr)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Drop every per-widget record of destroyed widgets.
    fn forget_widgets(&self, ids: &[WidgetId]) {
        {
            let mut bindings = self.bindings.lock();
            for id in ids {
                bindings.remove(*id);
            }
        }
        for id in ids {
            self.lifecycle.forget(*id);
        }
        self.panels.lock().retain(|_, root| !ids.contains(root));
        self.groups
            .lock()
            .retain(|group| group.buttons().iter().any(|widget| !ids.contains(widget)));
        tracing::trace!(target: "switchboard", count = ids.len(), "forgot destroyed widgets");
    }

    /// Warn about (and, with thread checks on, panic on) off-thread calls.
    pub(crate) fn check_thread(&self, operation: &str) {
        if !self.affinity.is_same_thread() {
            tracing::warn!(target: "switchboard", operation, "called off the UI thread");
            self.affinity.verify(operation);
        }
    }
}
