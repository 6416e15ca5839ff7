//! Command dispatch.
//!
//! A widget signal travels this path:
//!
//! 1. The widget's slot looks up its binding (panel + handler name). Unbound
//!    widgets are ignored.
//! 2. The panel's provider is fetched from the registry for the configured
//!    host application.
//! 3. If the widget's `_init` is still running the payload is parked.
//! 4. On first reference the paired `_init` runs once; attached menus it
//!    builds are wired.
//! 5. The handler runs, inside an undo chunk when it is undoable, and a
//!    success is recorded in the command history. Payloads parked during
//!    `_init` are replayed afterwards, in arrival order.
//!
//! Handler errors and panics stop at this boundary: they are logged and
//! shown through the message facility, never propagated into the toolkit.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use switchboard_core::{ConnectionId, MenuSlot, Payload, SignalKind, WidgetId};

use crate::context::{Binding, Switchboard};
use crate::error::{HandlerError, HandlerResult, Result, SwitchboardError};
use crate::history::HandlerRef;
use crate::lifecycle::InitStep;
use crate::menu::Menu;
use crate::naming::{self, WidgetKind};
use crate::provider::{Call, PanelProvider};
use crate::registry::panic_message;

/// What happened to one dispatched signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and succeeded.
    Invoked,
    /// The widget's `_init` is running; the payload will be replayed.
    Deferred,
    /// No provider layer has a handler for the widget.
    NoHandler,
    /// The widget is not bound to any handler.
    Unbound,
    /// The handler returned an error or panicked.
    Failed,
}

impl Switchboard {
    // =========================================================================
    // Wiring
    // =========================================================================

    /// Route the widget's default signal to `handler` of its panel's provider.
    ///
    /// Used for widgets whose names fall outside the naming convention.
    pub fn bind(&self, widget: WidgetId, handler: &str) -> Result<()> {
        let signal = self
            .tree
            .class(widget)?
            .default_signal()
            .unwrap_or(SignalKind::Clicked);
        self.bind_signal(widget, handler, signal)
    }

    /// Route a specific signal of the widget to `handler`.
    pub fn bind_signal(&self, widget: WidgetId, handler: &str, signal: SignalKind) -> Result<()> {
        let panel = self.panel_name_of(widget)?;
        self.connect_binding(widget, panel, handler.to_string(), signal)
    }

    /// Remove the widget's binding. Returns whether it was bound.
    pub fn unbind(&self, widget: WidgetId) -> bool {
        let Some(binding) = self.bindings.lock().remove(widget) else {
            return false;
        };
        if let Ok(signals) = self.tree.signals(widget) {
            signals.get(binding.signal).disconnect(binding.connection);
        }
        true
    }

    /// The handler name a widget is bound to.
    pub fn bound_handler(&self, widget: WidgetId) -> Option<String> {
        self.bindings
            .lock()
            .get(widget)
            .map(|binding| binding.handler.clone())
    }

    /// Connect an arbitrary closure to a widget signal, outside the
    /// lifecycle and history.
    pub fn on<F>(&self, widget: WidgetId, signal: SignalKind, slot: F) -> Result<ConnectionId>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.handle(widget).connect(signal, slot)
    }

    /// Bind every convention-named, not yet bound widget below `root`.
    ///
    /// Returns the number of widgets bound.
    pub fn wire_subtree(&self, panel: &str, root: WidgetId) -> Result<usize> {
        let mut wired = 0;
        for id in self.tree.descendants(root)? {
            if self.bindings.lock().contains_key(id) {
                continue;
            }
            let name = self.tree.name(id)?;
            let Some(key) = naming::resolve(&name) else {
                continue;
            };
            let signal = self.tree.class(id)?.default_signal().or(
                (key.kind == WidgetKind::Header).then_some(SignalKind::Clicked),
            );
            let Some(signal) = signal else {
                continue;
            };
            self.connect_binding(id, panel.to_string(), key.canonical(), signal)?;
            wired += 1;
        }
        tracing::debug!(target: "switchboard::dispatch", panel, wired, "wired widgets");
        Ok(wired)
    }

    fn connect_binding(
        &self,
        widget: WidgetId,
        panel: String,
        handler: String,
        signal: SignalKind,
    ) -> Result<()> {
        let signals = self.tree.signals(widget)?;
        self.unbind(widget);

        let switchboard = self.this.clone();
        let connection = signals.get(signal).connect(move |payload| {
            if let Some(switchboard) = switchboard.upgrade() {
                switchboard.dispatch(widget, payload.clone());
            }
        });
        tracing::trace!(target: "switchboard::dispatch", ?widget, %panel, %handler, %signal, "bound widget");
        self.bindings.lock().insert(
            widget,
            Binding {
                panel,
                handler,
                signal,
                connection,
            },
        );
        Ok(())
    }

    fn binding_of(&self, widget: WidgetId) -> Option<(String, String)> {
        self.bindings
            .lock()
            .get(widget)
            .map(|binding| (binding.panel.clone(), binding.handler.clone()))
    }

    pub(crate) fn panel_name_of(&self, widget: WidgetId) -> Result<String> {
        match self.tree.panel_of(widget)? {
            Some(root) => Ok(self.tree.name(root)?),
            None => Err(SwitchboardError::NotInPanel(self.tree.name(widget)?)),
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Route one signal payload of `widget` to its handler.
    ///
    /// Programmatic calls behave exactly like toolkit-originated signals.
    #[tracing::instrument(skip(self, payload), target = "switchboard::dispatch", level = "trace")]
    pub fn dispatch(&self, widget: WidgetId, payload: Payload) -> DispatchOutcome {
        self.check_thread("dispatch");
        let Some((panel, handler)) = self.binding_of(widget) else {
            tracing::trace!(target: "switchboard::dispatch", ?widget, "widget is not bound");
            return DispatchOutcome::Unbound;
        };
        let provider = self.provider(&panel);

        if self.lifecycle.defer(widget, &payload) {
            tracing::debug!(target: "switchboard::dispatch", %panel, %handler, "deferred until init completes");
            return DispatchOutcome::Deferred;
        }

        let pending = self.ensure_initialized(&provider, &panel, &handler, widget);
        let outcome = self.invoke(&provider, &panel, &handler, widget, payload);
        for payload in pending {
            self.invoke(&provider, &panel, &handler, widget, payload);
        }
        outcome
    }

    /// Deliver a toolkit signal by name: write the carried state, then emit.
    pub fn receive(&self, widget: WidgetId, signal: &str, payload: Payload) -> Result<()> {
        let kind = SignalKind::from_name(signal)
            .ok_or_else(|| SwitchboardError::UnknownSignal(signal.to_string()))?;
        self.tree.apply_signal(widget, kind, payload)?;
        Ok(())
    }

    /// Dispatch to the widget named `name` in `panel`, building the panel
    /// first if needed.
    pub fn trigger(&self, panel: &str, name: &str, payload: Payload) -> Result<DispatchOutcome> {
        let widget = self.panel(panel)?.find(name)?;
        Ok(self.dispatch(widget.id(), payload))
    }

    /// Re-dispatch the newest history entry with its original payload.
    ///
    /// The payload's state is written back to the widget first, as a
    /// toolkit signal would.
    pub fn repeat_last(&self) -> Option<DispatchOutcome> {
        let entry = self.history.last()?;
        tracing::debug!(target: "switchboard::dispatch", handler = %entry.handler.name, "repeating last command");
        if let Err(err) = self.tree.restore_payload(entry.handler.widget, &entry.payload) {
            tracing::debug!(target: "switchboard::dispatch", handler = %entry.handler.name, error = %err, "widget of last command is gone");
        }
        Some(self.dispatch(entry.handler.widget, entry.payload))
    }

    /// Run the widget's `_init` if it has not run yet.
    ///
    /// This is the display-intent hook: it is called when a widget's option
    /// menu is about to show and for the panel header.
    pub fn initialize(&self, widget: WidgetId) {
        let Some((panel, handler)) = self.binding_of(widget) else {
            return;
        };
        let provider = self.provider(&panel);
        for payload in self.ensure_initialized(&provider, &panel, &handler, widget) {
            self.invoke(&provider, &panel, &handler, widget, payload);
        }
    }

    /// The option menu of a widget, about to be shown.
    ///
    /// Runs the widget's `_init` first, then wires whatever it built.
    pub fn show_option_menu(&self, widget: WidgetId) -> Result<Menu> {
        self.show_menu(widget, MenuSlot::Option)
    }

    /// The context menu of a widget, about to be shown.
    pub fn show_context_menu(&self, widget: WidgetId) -> Result<Menu> {
        self.show_menu(widget, MenuSlot::Context)
    }

    fn show_menu(&self, widget: WidgetId, slot: MenuSlot) -> Result<Menu> {
        self.check_thread("show_menu");
        self.initialize(widget);
        let menu = self.tree.ensure_attached_menu(widget, slot)?;
        if let Ok(panel) = self.panel_name_of(widget) {
            self.wire_subtree(&panel, menu)?;
        }
        Ok(Menu::new(Arc::clone(&self.tree), menu))
    }

    fn ensure_initialized(
        &self,
        provider: &PanelProvider,
        panel: &str,
        handler: &str,
        widget: WidgetId,
    ) -> Vec<Payload> {
        if self.lifecycle.begin_init(widget) != InitStep::Run {
            return Vec::new();
        }

        if let Some((layer, instance)) = provider.resolve_init(handler) {
            tracing::debug!(target: "switchboard::dispatch", panel, handler, ?layer, "running init");
            let call = Call {
                switchboard: self,
                panel,
                widget: self.handle(widget),
                payload: Payload::None,
            };
            let result = self.guarded(|| instance.call_init(handler, &call).unwrap_or(Ok(())));
            if let Err(err) = result {
                self.report_failure(&format!("{handler}_init"), &err);
            }
        }

        let pending = self.lifecycle.finish_init(widget);
        if let Err(err) = self.wire_subtree(panel, widget) {
            tracing::warn!(target: "switchboard::dispatch", panel, handler, error = %err, "failed to wire attached menus");
        }
        pending
    }

    fn invoke(
        &self,
        provider: &PanelProvider,
        panel: &str,
        handler: &str,
        widget: WidgetId,
        payload: Payload,
    ) -> DispatchOutcome {
        let Some(resolved) = provider.resolve(handler) else {
            tracing::trace!(target: "switchboard::dispatch", panel, handler, "no handler");
            return DispatchOutcome::NoHandler;
        };
        let description = resolved
            .info
            .description
            .clone()
            .unwrap_or_else(|| handler.to_string());
        let call = Call {
            switchboard: self,
            panel,
            widget: self.handle(widget),
            payload,
        };

        let run = || self.guarded(|| resolved.provider.call_invoke(handler, &call).unwrap_or(Ok(())));
        let result = if resolved.info.undoable {
            self.transactions.as_transaction(&description, run)
        } else {
            run()
        };

        match result {
            Ok(()) => {
                tracing::trace!(target: "switchboard::dispatch", panel, handler, layer = ?resolved.layer, "handler invoked");
                self.history.push(
                    HandlerRef {
                        panel: panel.to_string(),
                        host_app: provider.host_app().to_string(),
                        name: handler.to_string(),
                        widget,
                    },
                    description,
                    call.payload,
                );
                self.lifecycle.mark_armed(widget);
                DispatchOutcome::Invoked
            }
            Err(err) => {
                self.report_failure(handler, &err);
                DispatchOutcome::Failed
            }
        }
    }

    fn guarded(&self, f: impl FnOnce() -> HandlerResult) -> HandlerResult {
        if !self.config.dispatch.catch_panics {
            return f();
        }
        catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
            Err(HandlerError::msg(format!(
                "panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
    }

    fn report_failure(&self, handler: &str, err: &HandlerError) {
        tracing::error!(target: "switchboard::dispatch", handler, error = %err, "handler failed");
        self.message_box(&format!("{handler}: {err}"));
    }
}
