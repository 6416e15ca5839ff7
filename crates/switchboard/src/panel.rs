//! Panel layouts and their lazy instantiation.

use std::sync::Arc;

use switchboard_core::{PerfSpan, WidgetClass, WidgetId};

use crate::context::Switchboard;
use crate::error::{Result, SwitchboardError};
use crate::menu::{Menu, WidgetHandle};
use crate::naming::{WidgetKey, WidgetKind};

impl Switchboard {
    /// Register the builder of panel `name`, replacing any previous one.
    ///
    /// The builder runs once, the first time the panel is referenced.
    pub fn register_layout<F>(&self, name: &str, layout: F)
    where
        F: Fn(&Menu) -> Result<()> + Send + Sync + 'static,
    {
        tracing::debug!(target: "switchboard", panel = name, "registered layout");
        self.layouts.write().insert(name.to_string(), Arc::new(layout));
    }

    /// Whether a layout is registered for `name`.
    pub fn has_layout(&self, name: &str) -> bool {
        self.layouts.read().contains_key(name)
    }

    /// Whether panel `name` has been instantiated.
    pub fn is_built(&self, name: &str) -> bool {
        self.panels.lock().contains_key(name)
    }

    /// Names of the instantiated panels, sorted.
    pub fn panel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.panels.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// The root menu of panel `name`, building it on first reference.
    ///
    /// Building runs the layout, wires every convention-named widget to the
    /// dispatcher and then runs `header_init` when the panel has a header.
    /// A failing layout leaves no trace: the half-built root is destroyed and
    /// the next reference tries again.
    pub fn panel(&self, name: &str) -> Result<Menu> {
        self.check_thread("panel");
        if let Some(root) = self.panels.lock().get(name) {
            return Ok(Menu::new(Arc::clone(&self.tree), *root));
        }

        let layout = self
            .layouts
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SwitchboardError::UnknownPanel(name.to_string()))?;

        let root = self.tree.insert(None, WidgetClass::Panel, name)?;
        {
            let mut panels = self.panels.lock();
            if let Some(existing) = panels.get(name) {
                let existing = *existing;
                drop(panels);
                self.discard(name, root);
                return Ok(Menu::new(Arc::clone(&self.tree), existing));
            }
            panels.insert(name.to_string(), root);
        }

        let menu = Menu::new(Arc::clone(&self.tree), root);
        let built = {
            let _span = PerfSpan::new("build_panel");
            layout(&menu).and_then(|()| self.wire_subtree(name, root))
        };
        if let Err(err) = built {
            tracing::warn!(target: "switchboard", panel = name, error = %err, "panel layout failed");
            self.panels.lock().remove(name);
            self.discard(name, root);
            return Err(err);
        }
        tracing::debug!(
            target: "switchboard",
            panel = name,
            widgets = self.tree.descendants(root)?.len(),
            "built panel"
        );

        let header_name = WidgetKey::new(WidgetKind::Header, 0).canonical();
        if let Some(header) = self.tree.find_in_scope(root, &header_name)? {
            self.initialize(header);
            // `header_init` may add widgets anywhere in the panel.
            self.wire_subtree(name, root)?;
        }
        Ok(menu)
    }

    /// Find a widget of panel `panel` by object name, building the panel
    /// if needed.
    pub fn find_widget(&self, panel: &str, name: &str) -> Result<WidgetHandle> {
        self.panel(panel)?.find(name)
    }

    /// Destroy a panel root that never became (or no longer is) the panel.
    ///
    /// Bindings and lifecycle records go with it through the tree's
    /// `destroyed` signal.
    fn discard(&self, name: &str, root: WidgetId) {
        if let Err(err) = self.tree.destroy(root) {
            tracing::warn!(target: "switchboard", panel = name, error = %err, "failed to destroy panel root");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::SwitchboardConfig;
    use crate::error::HandlerResult;
    use crate::lifecycle::LifecyclePhase;
    use crate::menu::{Label, PushButton, ToolButton};
    use crate::provider::{Call, HandlerTable, ProviderInstance};

    struct Edit {
        header_runs: Arc<AtomicUsize>,
    }

    fn header_init(edit: &Edit, _: &Call<'_>) -> HandlerResult {
        edit.header_runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn noop(_: &Edit, _: &Call<'_>) -> HandlerResult {
        Ok(())
    }

    fn add_reset_button(_: &Edit, call: &Call<'_>) -> HandlerResult {
        let panel = call.switchboard.panel(call.panel)?;
        panel.add(PushButton::new().object_name("b007").text("Reset"))?;
        Ok(())
    }

    #[test]
    fn test_panel_built_once() {
        let sb = Switchboard::new(SwitchboardConfig::default());
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        sb.register_layout("edit", move |menu| {
            counter.fetch_add(1, Ordering::SeqCst);
            menu.add(ToolButton::new().object_name("tb000").text("Merge"))?;
            menu.add(Label::new().object_name("title").text("Edit"))?;
            Ok(())
        });

        assert!(sb.has_layout("edit"));
        assert!(!sb.is_built("edit"));
        let first = sb.panel("edit").unwrap();
        let second = sb.panel("edit").unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(sb.panel_names(), vec!["edit"]);

        let tb = sb.find_widget("edit", "tb000").unwrap();
        assert_eq!(sb.bound_handler(tb.id()).as_deref(), Some("tb000"));
        let title = sb.find_widget("edit", "title").unwrap();
        assert_eq!(sb.bound_handler(title.id()), None);
    }

    #[test]
    fn test_unknown_panel() {
        let sb = Switchboard::new(SwitchboardConfig::default());
        assert!(matches!(
            sb.panel("nowhere"),
            Err(SwitchboardError::UnknownPanel(name)) if name == "nowhere"
        ));
    }

    #[test]
    fn test_failed_layout_is_rolled_back() {
        let sb = Switchboard::new(SwitchboardConfig::default());
        sb.register_layout("broken", |menu| {
            menu.add(PushButton::new().object_name("b000"))?;
            menu.add(PushButton::new().object_name("b000"))?;
            Ok(())
        });
        assert!(sb.panel("broken").is_err());
        assert!(!sb.is_built("broken"));
        assert_eq!(sb.tree().node_count(), 0);
    }

    #[test]
    fn test_header_init_runs_on_build() {
        let sb = Switchboard::new(SwitchboardConfig::default());
        let runs = Arc::new(AtomicUsize::new(0));
        let shared = runs.clone();
        sb.register_provider_instance("edit", None, move |_| {
            Ok(ProviderInstance::with_table(
                Edit {
                    header_runs: shared.clone(),
                },
                HandlerTable::<Edit>::new()
                    .handler("header", noop)
                    .init("header", header_init),
            ))
        });
        sb.register_layout("edit", |menu| {
            menu.add(PushButton::new().object_name("header").text("Edit"))?;
            Ok(())
        });

        let panel = sb.panel("edit").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let header = panel.find("header").unwrap();
        assert_eq!(sb.phase(header.id()), LifecyclePhase::Initialized);

        header.click().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(sb.phase(header.id()), LifecyclePhase::Armed);
    }

    #[test]
    fn test_widgets_added_by_header_init_are_wired() {
        let sb = Switchboard::new(SwitchboardConfig::default());
        sb.register_provider_instance("edit", None, |_| {
            Ok(ProviderInstance::with_table(
                Edit {
                    header_runs: Arc::default(),
                },
                HandlerTable::<Edit>::new()
                    .handler("header", noop)
                    .init("header", add_reset_button)
                    .handler("b007", noop),
            ))
        });
        sb.register_layout("edit", |menu| {
            menu.add(PushButton::new().object_name("header").text("Edit"))?;
            Ok(())
        });

        let panel = sb.panel("edit").unwrap();
        let reset = panel.find("b007").unwrap();
        assert_eq!(sb.tree().parent(reset.id()).unwrap(), Some(panel.id()));
        assert_eq!(sb.bound_handler(reset.id()).as_deref(), Some("b007"));
    }
}
