//! Bidirectional attribute mirroring between two widgets.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use switchboard_core::{
    ConnectionId, Payload, SignalKind, WidgetId, WidgetResult, WidgetState, WidgetTree,
};

use super::ApplyGuard;
use crate::error::Result;

/// An attribute a [`SyncLink`] can mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncAttr {
    /// Checked state, via `toggled`.
    Checked,
    /// Numeric value, via `valueChanged`.
    Value,
    /// Current index, via `currentIndexChanged`.
    Index,
    /// Line-edit text, via `textChanged`.
    Text,
}

impl SyncAttr {
    /// The signal announcing changes of this attribute.
    pub fn signal(self) -> SignalKind {
        match self {
            SyncAttr::Checked => SignalKind::Toggled,
            SyncAttr::Value => SignalKind::ValueChanged,
            SyncAttr::Index => SignalKind::IndexChanged,
            SyncAttr::Text => SignalKind::TextChanged,
        }
    }

    fn read(self, state: &WidgetState) -> Payload {
        match self {
            SyncAttr::Checked => Payload::Bool(state.checked),
            SyncAttr::Value => Payload::Value(state.value),
            SyncAttr::Index => Payload::Index(state.index),
            SyncAttr::Text => Payload::Text(state.text.clone()),
        }
    }

    fn write(self, tree: &WidgetTree, id: WidgetId, payload: &Payload) -> WidgetResult<bool> {
        match (self, payload) {
            (SyncAttr::Checked, Payload::Bool(checked)) => tree.set_checked(id, *checked),
            (SyncAttr::Value, Payload::Value(value)) => tree.set_value(id, *value),
            (SyncAttr::Index, Payload::Index(index)) => tree.set_index(id, *index),
            (SyncAttr::Text, Payload::Text(text)) => tree.set_text(id, text.clone()),
            _ => Ok(false),
        }
    }
}

/// Two widgets, typically in different panels, kept in agreement on one
/// attribute.
///
/// Creating the link copies `a`'s value onto `b`. Afterwards a change on
/// either side is written to the other; the write's own change signal is
/// not mirrored back. The link stays active until [`unlink`](Self::unlink).
#[derive(Debug)]
pub struct SyncLink {
    tree: Weak<WidgetTree>,
    a: WidgetId,
    b: WidgetId,
    attr: SyncAttr,
    connections: Mutex<Option<(ConnectionId, ConnectionId)>>,
}

impl SyncLink {
    /// Link `attr` of `a` and `b`.
    pub fn new(tree: &Arc<WidgetTree>, a: WidgetId, b: WidgetId, attr: SyncAttr) -> Result<Self> {
        let applying = Arc::new(AtomicBool::new(false));
        let signal = attr.signal();

        let initial = attr.read(&tree.state(a)?);
        {
            let _guard = ApplyGuard::enter(&applying);
            attr.write(tree, b, &initial)?;
        }

        let forward = mirror(tree, b, attr, &applying);
        let backward = mirror(tree, a, attr, &applying);
        let first = tree.signals(a)?.get(signal).connect(forward);
        let second = match tree.signals(b) {
            Ok(signals) => signals.get(signal).connect(backward),
            Err(err) => {
                tree.signals(a)?.get(signal).disconnect(first);
                return Err(err.into());
            }
        };

        tracing::debug!(target: "switchboard::sync", ?a, ?b, ?attr, "linked widgets");
        Ok(Self {
            tree: Arc::downgrade(tree),
            a,
            b,
            attr,
            connections: Mutex::new(Some((first, second))),
        })
    }

    /// The linked widgets.
    pub fn endpoints(&self) -> (WidgetId, WidgetId) {
        (self.a, self.b)
    }

    /// The mirrored attribute.
    pub fn attr(&self) -> SyncAttr {
        self.attr
    }

    /// Whether the link is active.
    pub fn is_linked(&self) -> bool {
        self.connections.lock().is_some()
    }

    /// Stop mirroring. Returns whether the link was active.
    pub fn unlink(&self) -> bool {
        let Some((first, second)) = self.connections.lock().take() else {
            return false;
        };
        if let Some(tree) = self.tree.upgrade() {
            let signal = self.attr.signal();
            if let Ok(signals) = tree.signals(self.a) {
                signals.get(signal).disconnect(first);
            }
            if let Ok(signals) = tree.signals(self.b) {
                signals.get(signal).disconnect(second);
            }
        }
        true
    }
}

fn mirror(
    tree: &Arc<WidgetTree>,
    target: WidgetId,
    attr: SyncAttr,
    applying: &Arc<AtomicBool>,
) -> impl Fn(&Payload) + Send + Sync + 'static {
    let tree = Arc::downgrade(tree);
    let applying = Arc::clone(applying);
    move |payload| {
        let Some(tree) = tree.upgrade() else {
            return;
        };
        let Some(_guard) = ApplyGuard::enter(&applying) else {
            return;
        };
        if let Err(err) = attr.write(&tree, target, payload) {
            tracing::warn!(target: "switchboard::sync", widget = ?target, error = %err, "failed to mirror attribute");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchboard_core::WidgetClass;

    fn two_panels(class: WidgetClass, name: &str) -> (Arc<WidgetTree>, WidgetId, WidgetId) {
        let tree = Arc::new(WidgetTree::new());
        let p1 = tree.insert(None, WidgetClass::Panel, "edit").unwrap();
        let p2 = tree.insert(None, WidgetClass::Panel, "uv").unwrap();
        let a = tree.insert(Some(p1), class, name).unwrap();
        let b = tree.insert(Some(p2), class, name).unwrap();
        (tree, a, b)
    }

    #[test]
    fn test_checked_mirrors_both_ways() {
        let (tree, a, b) = two_panels(WidgetClass::CheckBox, "chk000");
        tree.set_checkable(a, true).unwrap();
        tree.set_checkable(b, true).unwrap();
        tree.set_checked(a, true).unwrap();

        let link = SyncLink::new(&tree, a, b, SyncAttr::Checked).unwrap();
        assert!(tree.state(b).unwrap().checked);

        tree.set_checked(b, false).unwrap();
        assert!(!tree.state(a).unwrap().checked);
        tree.set_checked(a, true).unwrap();
        assert!(tree.state(b).unwrap().checked);

        assert!(link.unlink());
        assert!(!link.is_linked());
        tree.set_checked(a, false).unwrap();
        assert!(tree.state(b).unwrap().checked);
    }

    #[test]
    fn test_mirrored_write_is_not_echoed() {
        let (tree, a, b) = two_panels(WidgetClass::DoubleSpinBox, "s000");
        let _link = SyncLink::new(&tree, a, b, SyncAttr::Value).unwrap();

        let emissions = Arc::new(AtomicUsize::new(0));
        let counter = emissions.clone();
        tree.signals(a).unwrap().value_changed.connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tree.set_value(a, 2.5).unwrap();
        assert_eq!(tree.state(b).unwrap().value, 2.5);
        // One emission from the write on `a`; `b`'s mirror does not come back.
        assert_eq!(emissions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_index_and_text() {
        let (tree, a, b) = two_panels(WidgetClass::ComboBox, "cmb000");
        let _link = SyncLink::new(&tree, a, b, SyncAttr::Index).unwrap();
        tree.apply_signal(b, SignalKind::IndexChanged, Payload::Index(3))
            .unwrap();
        assert_eq!(tree.state(a).unwrap().index, 3);

        let (tree, a, b) = two_panels(WidgetClass::LineEdit, "txt000");
        let link = SyncLink::new(&tree, a, b, SyncAttr::Text).unwrap();
        assert_eq!(link.attr().signal(), SignalKind::TextChanged);
        tree.set_text(a, "pCube1").unwrap();
        assert_eq!(tree.state(b).unwrap().text, "pCube1");
    }
}
