//! Behavior-provider registry.
//!
//! Factories are registered per `(panel, Some(host_app))` for app-specific
//! providers and per `(panel, None)` for the shared base. The first lookup of
//! a `(panel, host_app)` key constructs both layers; the result is memoized
//! for the life of the switchboard. A failing or panicking constructor in
//! either layer degrades the key to the no-op provider.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::context::Switchboard;
use crate::error::ProviderError;
use crate::provider::{Handlers, PanelProvider, ProviderInstance};

type Factory =
    Arc<dyn Fn(&Switchboard) -> Result<ProviderInstance, ProviderError> + Send + Sync>;

type ProviderKey = (String, String);

/// Memoizing provider registry.
#[derive(Default)]
pub struct Registry {
    factories: RwLock<HashMap<(String, Option<String>), Factory>>,
    instances: Mutex<HashMap<ProviderKey, Arc<PanelProvider>>>,
    constructing: Mutex<HashSet<ProviderKey>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("factories", &self.factories.read().len())
            .field("instances", &self.instances.lock().len())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider constructor.
    ///
    /// `host_app = None` registers the shared base provider of the panel.
    pub fn register<P, F>(&self, panel: &str, host_app: Option<&str>, ctor: F)
    where
        P: Handlers,
        F: Fn(&Switchboard) -> Result<P, ProviderError> + Send + Sync + 'static,
    {
        self.register_erased(panel, host_app, move |sb| ctor(sb).map(ProviderInstance::new));
    }

    /// Register a constructor that builds the [`ProviderInstance`] itself,
    /// e.g. with a hand-built handler table.
    pub fn register_erased<F>(&self, panel: &str, host_app: Option<&str>, ctor: F)
    where
        F: Fn(&Switchboard) -> Result<ProviderInstance, ProviderError> + Send + Sync + 'static,
    {
        let key = (panel.to_string(), host_app.map(str::to_string));
        if self.factories.write().insert(key, Arc::new(ctor)).is_some() {
            tracing::warn!(target: "switchboard::registry", panel, ?host_app, "replaced provider factory");
        }
    }

    /// Whether any factory exists for the panel.
    pub fn has_panel(&self, panel: &str) -> bool {
        self.factories.read().keys().any(|(p, _)| p == panel)
    }

    /// Whether the `(panel, host_app)` provider was already constructed.
    pub fn is_constructed(&self, panel: &str, host_app: &str) -> bool {
        self.instances
            .lock()
            .contains_key(&(panel.to_string(), host_app.to_string()))
    }

    /// Return the memoized provider of `(panel, host_app)`, constructing it on
    /// first access.
    pub fn get_or_create(&self, sb: &Switchboard, panel: &str, host_app: &str) -> Arc<PanelProvider> {
        let key = (panel.to_string(), host_app.to_string());
        if let Some(existing) = self.instances.lock().get(&key) {
            return Arc::clone(existing);
        }

        if !self.constructing.lock().insert(key.clone()) {
            tracing::warn!(target: "switchboard::registry", panel, host_app, "provider requested while it is being constructed");
            return Arc::new(PanelProvider::noop(panel, host_app));
        }
        // No lock is held here: constructors may look up other providers.
        let built = Arc::new(self.construct(sb, panel, host_app));
        self.constructing.lock().remove(&key);

        Arc::clone(self.instances.lock().entry(key).or_insert(built))
    }

    fn construct(&self, sb: &Switchboard, panel: &str, host_app: &str) -> PanelProvider {
        let (app_factory, base_factory) = {
            let factories = self.factories.read();
            (
                factories
                    .get(&(panel.to_string(), Some(host_app.to_string())))
                    .cloned(),
                factories.get(&(panel.to_string(), None)).cloned(),
            )
        };

        let app = match app_factory.map(|f| run_factory(&f, sb)).transpose() {
            Ok(app) => app,
            Err(err) => return degraded(panel, host_app, "app", &err),
        };
        let base = match base_factory.map(|f| run_factory(&f, sb)).transpose() {
            Ok(base) => base,
            Err(err) => return degraded(panel, host_app, "base", &err),
        };

        if app.is_none() && base.is_none() {
            tracing::trace!(target: "switchboard::registry", panel, host_app, "no provider registered, using no-op");
        } else {
            tracing::debug!(
                target: "switchboard::registry",
                panel,
                host_app,
                app = ?app.as_ref().map(ProviderInstance::type_name),
                base = ?base.as_ref().map(ProviderInstance::type_name),
                "constructed provider"
            );
        }
        PanelProvider::new(panel, host_app, app, base)
    }
}

fn run_factory(factory: &Factory, sb: &Switchboard) -> Result<ProviderInstance, ProviderError> {
    catch_unwind(AssertUnwindSafe(|| factory(sb))).unwrap_or_else(|panic| {
        Err(ProviderError::Other(format!(
            "constructor panicked: {}",
            panic_message(panic.as_ref())
        )))
    })
}

fn degraded(panel: &str, host_app: &str, layer: &str, err: &ProviderError) -> PanelProvider {
    tracing::error!(
        target: "switchboard::registry",
        panel,
        host_app,
        layer,
        error = %err,
        "provider construction failed, falling back to no-op"
    );
    PanelProvider::noop(panel, host_app)
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
