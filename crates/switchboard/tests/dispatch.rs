//! Integration tests for provider resolution, the handler lifecycle and
//! command dispatch.

use std::sync::Arc;

use parking_lot::Mutex;
use switchboard::prelude::*;
use switchboard::testing::{RecordingHost, RecordingMessages};
use switchboard::{Layer, LifecyclePhase, ProviderError, ProviderInstance};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Log = Arc<Mutex<Vec<String>>>;

struct EditBase {
    log: Log,
}

#[handlers]
impl EditBase {
    /// Delete history
    fn b000(&self, _call: &Call<'_>) -> HandlerResult {
        self.log.lock().push("base:b000".into());
        Ok(())
    }

    fn b001(&self, _call: &Call<'_>) -> HandlerResult {
        self.log.lock().push("base:b001".into());
        Ok(())
    }

    fn tb000_init(&self, call: &Call<'_>) -> HandlerResult {
        self.log.lock().push("init:tb000".into());
        let menu = call.widget.option_menu()?;
        menu.add(CheckBox::new().object_name("chk000").text("Keep faces together"))?;
        Ok(())
    }

    /// Extrude
    #[handler(undoable)]
    fn tb000(&self, call: &Call<'_>) -> HandlerResult {
        call.host().execute("polyExtrudeFacet")?;
        self.log.lock().push("base:tb000".into());
        Ok(())
    }

    fn chk000(&self, call: &Call<'_>) -> HandlerResult {
        self.log.lock().push(format!("chk000:{}", call.checked()));
        Ok(())
    }

    fn chk001_init(&self, call: &Call<'_>) -> HandlerResult {
        call.widget.set_checked(false)?;
        Ok(())
    }

    fn chk001(&self, call: &Call<'_>) -> HandlerResult {
        self.log.lock().push(format!("chk001:{}", call.checked()));
        Ok(())
    }

    fn b002(&self, _call: &Call<'_>) -> HandlerResult {
        Err(HandlerError::msg("nothing selected"))
    }

    #[handler(undoable, description = "Bevel")]
    fn b003(&self, call: &Call<'_>) -> HandlerResult {
        call.host().execute("polyBevel")?;
        Ok(())
    }

    #[handler(undoable)]
    fn b004(&self, _call: &Call<'_>) -> HandlerResult {
        panic!("bevel exploded");
    }

    /// Delete history and center pivot
    fn b005(&self, call: &Call<'_>) -> HandlerResult {
        let outcome = call.switchboard.trigger(call.panel, "b000", Payload::None)?;
        self.log.lock().push(format!("base:b005:{outcome:?}"));
        Ok(())
    }

    #[handler(name = "okButton")]
    fn confirm(&self, _call: &Call<'_>) -> HandlerResult {
        self.log.lock().push("okButton".into());
        Ok(())
    }

    fn log_len(&self) -> usize {
        self.log.lock().len()
    }
}

struct EditMaya {
    log: Log,
}

#[handlers]
impl EditMaya {
    fn b001(&self, _call: &Call<'_>) -> HandlerResult {
        self.log.lock().push("maya:b001".into());
        Ok(())
    }
}

struct Fixture {
    sb: Arc<Switchboard>,
    host: Arc<RecordingHost>,
    messages: Arc<RecordingMessages>,
    log: Log,
}

fn fixture(host_app: &str) -> Fixture {
    init_tracing();
    let host = Arc::new(RecordingHost::new());
    let messages = Arc::new(RecordingMessages::new());
    let sb = Switchboard::builder()
        .config(SwitchboardConfig::default().with_host_app(host_app))
        .host(host.clone())
        .messages(messages.clone())
        .build();
    let log: Log = Arc::default();

    let base_log = log.clone();
    sb.register_provider("edit", None, move |_| Ok(EditBase { log: base_log.clone() }));
    let maya_log = log.clone();
    sb.register_provider("edit", Some("maya"), move |_| Ok(EditMaya { log: maya_log.clone() }));
    sb.register_layout("edit", |menu| {
        menu.add(PushButton::new().object_name("b000").text("Delete history"))?;
        menu.add(PushButton::new().object_name("b001"))?;
        menu.add(PushButton::new().object_name("b002"))?;
        menu.add(PushButton::new().object_name("b003"))?;
        menu.add(PushButton::new().object_name("b004"))?;
        menu.add(PushButton::new().object_name("b005"))?;
        menu.add(ToolButton::new().object_name("tb000").text("Extrude"))?;
        menu.add(CheckBox::new().object_name("chk001"))?;
        menu.add(PushButton::new().object_name("okButton").text("OK"))?;
        Ok(())
    });

    Fixture {
        sb,
        host,
        messages,
        log,
    }
}

impl Fixture {
    fn click(&self, name: &str) {
        self.sb.find_widget("edit", name).unwrap().click().unwrap();
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[test]
fn test_get_provider_is_memoized_per_key() {
    let f = fixture("maya");
    let first = f.sb.get_provider("edit", "maya");
    let second = f.sb.get_provider("edit", "maya");
    assert!(Arc::ptr_eq(&first, &second));

    let other = f.sb.get_provider("edit", "blender");
    assert!(!Arc::ptr_eq(&first, &other));
    assert!(other.app().is_none());
    assert!(other.downcast_ref::<EditBase>().is_some());
    assert_eq!(first.downcast_ref::<EditBase>().unwrap().log_len(), 0);
}

#[test]
fn test_app_layer_overrides_base() {
    let f = fixture("maya");
    f.click("b000");
    f.click("b001");
    assert_eq!(f.log(), vec!["base:b000", "maya:b001"]);

    let provider = f.sb.provider("edit");
    assert_eq!(provider.resolve("b001").unwrap().layer, Layer::App);
    assert_eq!(provider.resolve("b000").unwrap().layer, Layer::Base);
    assert!(provider.resolve("b999").is_none());
}

#[test]
fn test_base_only_for_other_host() {
    let f = fixture("houdini");
    f.click("b001");
    assert_eq!(f.log(), vec!["base:b001"]);
}

#[test]
fn test_init_runs_exactly_once() {
    let f = fixture("maya");
    let tb = f.sb.find_widget("edit", "tb000").unwrap();
    assert_eq!(f.sb.phase(tb.id()), LifecyclePhase::Unbound);

    for _ in 0..3 {
        tb.click().unwrap();
    }
    let log = f.log();
    assert_eq!(log.iter().filter(|l| *l == "init:tb000").count(), 1);
    assert_eq!(log.iter().filter(|l| *l == "base:tb000").count(), 3);
    assert_eq!(log[0], "init:tb000");
    assert_eq!(f.sb.phase(tb.id()), LifecyclePhase::Armed);
}

#[test]
fn test_option_menu_built_by_init_is_wired() {
    let f = fixture("maya");
    let tb = f.sb.find_widget("edit", "tb000").unwrap();
    let menu = f.sb.show_option_menu(tb.id()).unwrap();
    assert_eq!(f.log(), vec!["init:tb000"]);

    let chk = menu.find("chk000").unwrap();
    assert_eq!(f.sb.bound_handler(chk.id()).as_deref(), Some("chk000"));
    chk.click().unwrap();
    chk.click().unwrap();
    assert_eq!(f.log()[1..], ["chk000:true", "chk000:false"]);

    // Showing again neither re-runs init nor duplicates the menu.
    let again = f.sb.show_option_menu(tb.id()).unwrap();
    assert_eq!(again.id(), menu.id());
    assert_eq!(again.widgets().unwrap().len(), 1);
}

#[test]
fn test_signals_during_init_are_replayed_in_order() {
    let f = fixture("maya");
    let chk = f.sb.find_widget("edit", "chk001").unwrap();
    // The click checks the box; `_init` unchecks it again while running.
    chk.click().unwrap();
    assert_eq!(f.log(), vec!["chk001:true", "chk001:false"]);
    assert!(!chk.state().unwrap().checked);
}

#[test]
fn test_handler_may_trigger_another_handler() {
    let f = fixture("maya");
    f.click("b005");
    assert_eq!(f.log(), vec!["base:b000", "base:b005:Invoked"]);
    assert_eq!(
        f.sb.history().recent(2).descriptions(),
        vec!["Delete history", "Delete history and center pivot"]
    );
}

#[test]
fn test_free_form_names_are_not_wired() {
    let f = fixture("maya");
    let ok = f.sb.find_widget("edit", "okButton").unwrap();
    assert_eq!(f.sb.bound_handler(ok.id()), None);
    ok.click().unwrap();
    assert_eq!(f.sb.dispatch(ok.id(), Payload::None), DispatchOutcome::Unbound);
    assert!(f.log().is_empty());

    f.sb.bind(ok.id(), "okButton").unwrap();
    ok.click().unwrap();
    assert_eq!(f.log(), vec!["okButton"]);

    assert!(f.sb.unbind(ok.id()));
    ok.click().unwrap();
    assert_eq!(f.log().len(), 1);
}

#[test]
fn test_unregistered_panel_dispatches_to_nothing() {
    let f = fixture("maya");
    f.sb.register_layout("uv", |menu| {
        menu.add(PushButton::new().object_name("b000"))?;
        Ok(())
    });
    let b = f.sb.find_widget("uv", "b000").unwrap();
    assert_eq!(f.sb.dispatch(b.id(), Payload::None), DispatchOutcome::NoHandler);
    assert!(f.sb.provider("uv").is_noop());
    assert!(f.messages.messages().is_empty());
}

#[test]
fn test_failed_construction_degrades_to_noop() {
    init_tracing();
    let sb = Switchboard::new(SwitchboardConfig::default());
    sb.register_provider_instance("edit", None, |_| {
        Err(ProviderError::HostUnavailable("maya.cmds".into()))
    });
    sb.register_layout("edit", |menu| {
        menu.add(PushButton::new().object_name("b000"))?;
        Ok(())
    });

    let provider = sb.provider("edit");
    assert!(provider.is_noop());
    assert!(Arc::ptr_eq(&provider, &sb.provider("edit")));
    let b = sb.find_widget("edit", "b000").unwrap();
    assert_eq!(sb.dispatch(b.id(), Payload::None), DispatchOutcome::NoHandler);
}

#[test]
fn test_panicking_constructor_degrades_to_noop() {
    init_tracing();
    let sb = Switchboard::new(SwitchboardConfig::default());
    sb.register_provider_instance("edit", None, |_| -> Result<ProviderInstance, ProviderError> {
        panic!("no host module")
    });
    assert!(sb.provider("edit").is_noop());
}

#[test]
fn test_handler_failure_reaches_message_box() {
    let f = fixture("maya");
    let b = f.sb.find_widget("edit", "b002").unwrap();
    assert_eq!(f.sb.dispatch(b.id(), Payload::None), DispatchOutcome::Failed);
    assert_eq!(f.messages.messages(), vec!["b002: nothing selected"]);
    assert!(f.sb.history().is_empty());
}

#[test]
fn test_undoable_handler_runs_in_one_chunk() {
    let f = fixture("maya");
    f.click("b003");
    assert_eq!(f.host.open_count(), 1);
    assert_eq!(f.host.close_count(), 1);
    assert_eq!(f.host.executed(), vec!["polyBevel"]);
    assert_eq!(f.sb.history().last().unwrap().description, "Bevel");
}

#[test]
fn test_undo_chunk_closes_on_error() {
    let f = fixture("maya");
    f.host.fail_command("polyBevel");
    f.click("b003");
    assert_eq!(f.host.open_count(), 1);
    assert_eq!(f.host.close_count(), 1);
    assert!(!f.sb.transactions().is_open());
    let messages = f.messages.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("b003: command 'polyBevel' failed"));
}

#[test]
fn test_undo_chunk_closes_on_panic() {
    let f = fixture("maya");
    let b = f.sb.find_widget("edit", "b004").unwrap();
    assert_eq!(f.sb.dispatch(b.id(), Payload::None), DispatchOutcome::Failed);
    assert_eq!(f.host.open_count(), 1);
    assert_eq!(f.host.close_count(), 1);
    assert_eq!(f.sb.transactions().depth(), 0);
    assert!(f.messages.messages()[0].contains("bevel exploded"));
}

#[test]
fn test_history_records_and_repeats() {
    let f = fixture("maya");
    f.click("b000");
    f.click("tb000");

    let history = f.sb.history();
    assert_eq!(history.len(), 2);
    let last = history.last().unwrap();
    assert_eq!(last.description, "Extrude");
    assert_eq!(last.handler.name, "tb000");
    assert_eq!(last.handler.host_app, "maya");
    assert_eq!(history.recent(2).descriptions(), vec!["Delete history", "Extrude"]);

    assert_eq!(f.sb.repeat_last(), Some(DispatchOutcome::Invoked));
    assert_eq!(f.host.executed(), vec!["polyExtrudeFacet", "polyExtrudeFacet"]);
    assert_eq!(history.len(), 3);
}

#[test]
fn test_history_is_capped() {
    init_tracing();
    let mut config = SwitchboardConfig::default();
    config.history.capacity = 2;
    let sb = Switchboard::new(config);
    let log: Log = Arc::default();
    let shared = log.clone();
    sb.register_provider("edit", None, move |_| Ok(EditBase { log: shared.clone() }));
    sb.register_layout("edit", |menu| {
        menu.add(PushButton::new().object_name("b000"))?;
        menu.add(PushButton::new().object_name("b001"))?;
        Ok(())
    });

    for name in ["b000", "b001", "b000", "b001", "b000"] {
        sb.trigger("edit", name, Payload::None).unwrap();
    }
    assert_eq!(sb.history().len(), 2);
    let names: Vec<String> = sb
        .history()
        .recent(10)
        .iter()
        .map(|entry| entry.handler.name.clone())
        .collect();
    assert_eq!(names, vec!["b001", "b000"]);
    assert_eq!(log.lock().len(), 5);
}

#[test]
fn test_receive_applies_toolkit_signal() {
    let f = fixture("maya");
    let chk = f.sb.find_widget("edit", "chk001").unwrap();
    f.sb.receive(chk.id(), "toggled", Payload::Bool(true)).unwrap();
    assert!(f.log().contains(&"chk001:true".to_string()));
    assert!(f.sb.receive(chk.id(), "exploded", Payload::None).is_err());
}

struct Short {
    log: Log,
}

#[handlers]
impl Short {
    fn b12(&self, _call: &Call<'_>) -> HandlerResult {
        self.log.lock().push("b12".into());
        Ok(())
    }

    fn tb1(&self, call: &Call<'_>) -> HandlerResult {
        self.log.lock().push(format!("tb1:{}", call.widget.name()?));
        Ok(())
    }

    fn cmb3(&self, call: &Call<'_>) -> HandlerResult {
        self.log.lock().push(format!("cmb3:{}", call.index()));
        Ok(())
    }

    fn label_for(&self, key: &str) -> usize {
        key.len()
    }
}

fn short_panel() -> (Arc<Switchboard>, Log) {
    init_tracing();
    let sb = Switchboard::new(SwitchboardConfig::default());
    let log: Log = Arc::default();
    let shared = log.clone();
    sb.register_provider("short", None, move |_| Ok(Short { log: shared.clone() }));
    sb.register_layout("short", |menu| {
        menu.add(PushButton::new().object_name("b12"))?;
        menu.add(ToolButton::new().object_name("tb1"))?;
        menu.add(ToolButton::new().object_name("tb001"))?;
        menu.add(ComboBox::new().object_name("cmb003").items(["a", "b", "c"]))?;
        Ok(())
    });
    (sb, log)
}

#[test]
fn test_unpadded_names_reach_their_handlers() {
    let (sb, log) = short_panel();
    let b12 = sb.find_widget("short", "b12").unwrap();
    assert_eq!(sb.bound_handler(b12.id()).as_deref(), Some("b012"));
    assert_eq!(sb.dispatch(b12.id(), Payload::None), DispatchOutcome::Invoked);

    sb.find_widget("short", "tb1").unwrap().click().unwrap();
    sb.find_widget("short", "tb001").unwrap().click().unwrap();
    assert_eq!(*log.lock(), vec!["b12", "tb1:tb1", "tb1:tb001"]);
    assert_eq!(sb.history().last().unwrap().handler.name, "tb001");
}

#[test]
fn test_helper_methods_are_not_handlers() {
    let table = <Short as Handlers>::handler_table();
    assert!(!table.contains("label_for"));
    assert_eq!(table.len(), 3);
    assert_eq!(Short { log: Log::default() }.label_for("b12"), 3);
}

#[test]
fn test_repeat_last_restores_widget_state() {
    let (sb, log) = short_panel();
    let cmb = sb.find_widget("short", "cmb003").unwrap();
    cmb.set_index(2).unwrap();
    {
        let signals = sb.tree().signals(cmb.id()).unwrap();
        let _blocked = signals.index_changed.blocker();
        cmb.set_index(0).unwrap();
    }
    assert_eq!(cmb.state().unwrap().index, 0);

    assert_eq!(sb.repeat_last(), Some(DispatchOutcome::Invoked));
    assert_eq!(cmb.state().unwrap().index, 2);
    assert_eq!(*log.lock(), vec!["cmb3:2", "cmb3:2"]);
}
