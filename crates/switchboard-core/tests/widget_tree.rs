//! Integration tests for the retained widget tree and its signals.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use switchboard_core::{
    MenuSlot, Payload, SignalKind, TreeFormatOptions, TreeStyle, UiQueue, WidgetClass,
    WidgetError, WidgetTree, WidgetTreeDebug,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_names_are_scoped_by_panel_and_menu() {
    init_tracing();
    let tree = WidgetTree::new();
    let edit = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let uv = tree.insert(None, WidgetClass::Panel, "uv").unwrap();

    let tb = tree.insert(Some(edit), WidgetClass::ToolButton, "tb000").unwrap();
    tree.insert(Some(uv), WidgetClass::ToolButton, "tb000").unwrap();
    assert!(matches!(
        tree.insert(Some(edit), WidgetClass::PushButton, "tb000"),
        Err(WidgetError::DuplicateName { .. })
    ));

    // An option menu opens its own scope, so `chk000` may repeat there.
    let options = tree.ensure_attached_menu(tb, MenuSlot::Option).unwrap();
    tree.insert(Some(edit), WidgetClass::CheckBox, "chk000").unwrap();
    let nested = tree.insert(Some(options), WidgetClass::CheckBox, "chk000").unwrap();

    assert_eq!(tree.scope(nested).unwrap(), options);
    assert_eq!(tree.panel_of(nested).unwrap(), Some(edit));
    assert_eq!(tree.menu_owner(options).unwrap(), Some(tb));
    let outer = tree.find_in_scope(edit, "chk000").unwrap().unwrap();
    assert_ne!(outer, nested);
    assert_eq!(tree.scope(outer).unwrap(), edit);
    assert_eq!(tree.ancestors(nested).unwrap(), vec![options, tb, edit]);
}

#[test]
fn test_destroy_removes_subtree_and_menu_link() {
    let tree = WidgetTree::new();
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let tb = tree.insert(Some(panel), WidgetClass::ToolButton, "tb000").unwrap();
    let menu = tree.ensure_attached_menu(tb, MenuSlot::Context).unwrap();
    let item = tree.insert(Some(menu), WidgetClass::PushButton, "b000").unwrap();
    assert_eq!(tree.node_count(), 4);

    let removed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = removed.clone();
    tree.destroyed()
        .connect(move |ids: &Vec<_>| sink.lock().extend(ids.iter().copied()));

    tree.destroy(menu).unwrap();
    assert_eq!(*removed.lock(), vec![menu, item]);
    assert_eq!(tree.attached_menu(tb, MenuSlot::Context).unwrap(), None);
    assert!(!tree.contains(item));
    assert!(matches!(tree.state(item), Err(WidgetError::InvalidWidgetId(_))));
    assert_eq!(tree.node_count(), 2);
}

#[test]
fn test_reparenting_rejects_cycles() {
    let tree = WidgetTree::new();
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let group = tree.insert(Some(panel), WidgetClass::Container, "").unwrap();
    let inner = tree.insert(Some(group), WidgetClass::Container, "").unwrap();
    assert_eq!(tree.set_parent(group, Some(inner)), Err(WidgetError::CircularParentage));
    tree.set_parent(inner, Some(panel)).unwrap();
    assert_eq!(tree.children(panel).unwrap(), vec![group, inner]);
}

#[test]
fn test_notifying_setters_emit_on_change_only() {
    let tree = WidgetTree::new();
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let spin = tree.insert(Some(panel), WidgetClass::DoubleSpinBox, "s000").unwrap();
    tree.set_limits(spin, switchboard_core::Limits::new(0.0, 5.0, 0.5, 1))
        .unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    tree.signals(spin)
        .unwrap()
        .value_changed
        .connect(move |payload| sink.lock().push(payload.clone()));

    assert!(tree.set_value(spin, 2.0).unwrap());
    assert!(!tree.set_value(spin, 2.0).unwrap());
    assert!(tree.set_value(spin, 99.0).unwrap());
    assert_eq!(*seen.lock(), vec![Payload::Value(2.0), Payload::Value(5.0)]);
}

#[test]
fn test_apply_signal_writes_state_before_emitting() {
    let tree = Arc::new(WidgetTree::new());
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let combo = tree.insert(Some(panel), WidgetClass::ComboBox, "cmb000").unwrap();
    tree.set_items(combo, ["a", "b", "c"]).unwrap();

    let observed = Arc::new(AtomicUsize::new(usize::MAX));
    let (observer, reader) = (observed.clone(), Arc::downgrade(&tree));
    tree.signals(combo).unwrap().get(SignalKind::IndexChanged).connect(move |_| {
        if let Some(tree) = reader.upgrade() {
            observer.store(tree.state(combo).unwrap().index as usize, Ordering::SeqCst);
        }
    });

    tree.apply_signal(combo, SignalKind::IndexChanged, Payload::Index(2))
        .unwrap();
    assert_eq!(observed.load(Ordering::SeqCst), 2);
    assert_eq!(tree.display_text(combo).unwrap(), "c");
}

#[test]
fn test_disabled_widgets_ignore_clicks() {
    let tree = WidgetTree::new();
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let chk = tree.insert(Some(panel), WidgetClass::CheckBox, "chk000").unwrap();
    tree.set_enabled(chk, false).unwrap();
    assert!(!tree.click(chk).unwrap());
    assert!(!tree.state(chk).unwrap().checked);

    tree.set_enabled(chk, true).unwrap();
    assert!(tree.click(chk).unwrap());
    assert!(tree.state(chk).unwrap().checked);
}

#[test]
fn test_tree_debug_output() {
    let tree = WidgetTree::new();
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    tree.insert(Some(panel), WidgetClass::ToolButton, "tb000").unwrap();
    tree.insert(Some(panel), WidgetClass::Container, "").unwrap();

    let options = TreeFormatOptions {
        style: TreeStyle::Ascii,
        ..TreeFormatOptions::default()
    };
    let output = WidgetTreeDebug::with_options(options)
        .format_subtree(&tree, panel)
        .unwrap();
    assert!(output.starts_with("edit"));
    assert!(output.contains("+-- tb000"));
    assert!(output.contains("`-- (unnamed)"));
}

#[test]
fn test_worker_posts_run_on_drain() {
    let queue = UiQueue::new();
    let tree = Arc::new(WidgetTree::new());
    let panel = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
    let label = tree.insert(Some(panel), WidgetClass::Label, "lbl000").unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let poster = queue.poster();
            let tree = Arc::clone(&tree);
            std::thread::spawn(move || {
                assert!(poster.post(move || {
                    tree.set_text(label, format!("done {i}")).unwrap();
                }));
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(queue.len(), 4);
    assert_eq!(queue.drain(), 4);
    assert!(queue.is_empty());
    assert!(tree.state(label).unwrap().text.starts_with("done"));
}
