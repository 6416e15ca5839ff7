//! Command history.
//!
//! A process-wide, fixed-capacity, most-recent-last record of successful
//! handler invocations. Views returned by [`CommandHistory::recent`] and
//! [`CommandHistory::slice`] share a copy-on-write snapshot: pushing after a
//! view was taken never changes the view, and a view can be iterated any
//! number of times.

use std::collections::{HashSet, VecDeque};
use std::ops::{Bound, Range, RangeBounds};
use std::sync::Arc;

use parking_lot::Mutex;
use switchboard_core::{Payload, WidgetId};

/// Identifies the handler an entry invoked.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    /// Panel the widget belongs to.
    pub panel: String,
    /// Host application the provider was resolved for.
    pub host_app: String,
    /// Handler name.
    pub name: String,
    /// The widget that triggered the call.
    pub widget: WidgetId,
}

/// One recorded invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    /// The invoked handler.
    pub handler: HandlerRef,
    /// Short human-readable description.
    pub description: String,
    /// The payload the handler received, for repeat-last.
    pub payload: Payload,
    /// Process-wide sequence number, increasing.
    pub sequence: u64,
}

struct HistoryInner {
    entries: Arc<VecDeque<HistoryEntry>>,
    capacity: usize,
    next_sequence: u64,
}

/// Capped, insertion-ordered command history.
pub struct CommandHistory {
    inner: Mutex<HistoryInner>,
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CommandHistory")
            .field("len", &inner.entries.len())
            .field("capacity", &inner.capacity)
            .finish()
    }
}

impl CommandHistory {
    /// Create an empty history; a capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(HistoryInner {
                entries: Arc::new(VecDeque::with_capacity(capacity)),
                capacity,
                next_sequence: 0,
            }),
        }
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an entry, evicting the oldest past capacity.
    pub fn push(&self, handler: HandlerRef, description: impl Into<String>, payload: Payload) {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        let capacity = inner.capacity;
        let entries = Arc::make_mut(&mut inner.entries);
        entries.push_back(HistoryEntry {
            handler,
            description: description.into(),
            payload,
            sequence,
        });
        while entries.len() > capacity {
            entries.pop_front();
        }
        tracing::trace!(target: "switchboard::history", sequence, len = entries.len(), "recorded command");
    }

    /// The newest entry.
    pub fn last(&self) -> Option<HistoryEntry> {
        self.inner.lock().entries.back().cloned()
    }

    /// View of the most recent `n` entries, most-recent-last.
    pub fn recent(&self, n: usize) -> HistoryView {
        let entries = Arc::clone(&self.inner.lock().entries);
        let len = entries.len();
        HistoryView {
            entries,
            range: len.saturating_sub(n)..len,
        }
    }

    /// View of a sub-range, indexed oldest-first. Out-of-range bounds are clamped.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> HistoryView {
        let entries = Arc::clone(&self.inner.lock().entries);
        let range = clamp_range(range, entries.len());
        HistoryView { entries, range }
    }

    /// The most recent `n` distinct handlers, most-recent-last.
    ///
    /// Repeated invocations of a handler collapse to their latest occurrence.
    pub fn recent_unique(&self, n: usize) -> Vec<HistoryEntry> {
        let entries = Arc::clone(&self.inner.lock().entries);
        let mut seen = HashSet::new();
        let mut result: Vec<HistoryEntry> = entries
            .iter()
            .rev()
            .filter(|entry| {
                seen.insert((
                    entry.handler.panel.as_str(),
                    entry.handler.host_app.as_str(),
                    entry.handler.name.as_str(),
                ))
            })
            .take(n)
            .cloned()
            .collect();
        result.reverse();
        result
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries = Arc::new(VecDeque::with_capacity(inner.capacity));
    }
}

fn clamp_range(range: impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    let end = end.min(len);
    start.min(end)..end
}

/// A restartable view over a snapshot of the history.
#[derive(Clone, Debug)]
pub struct HistoryView {
    entries: Arc<VecDeque<HistoryEntry>>,
    range: Range<usize>,
}

impl HistoryView {
    /// Number of entries in the view.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Entry at `index` within the view (0 is the oldest).
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        if index >= self.len() {
            return None;
        }
        self.entries.get(self.range.start + index)
    }

    /// The newest entry of the view.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate oldest to newest; reverse with `.rev()`.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.range(self.range.clone())
    }

    /// A sub-view, indexed relative to this view.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> HistoryView {
        let inner = clamp_range(range, self.len());
        HistoryView {
            entries: Arc::clone(&self.entries),
            range: self.range.start + inner.start..self.range.start + inner.end,
        }
    }

    /// Descriptions, oldest to newest.
    pub fn descriptions(&self) -> Vec<String> {
        self.iter().map(|entry| entry.description.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a HistoryView {
    type Item = &'a HistoryEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.range(self.range.clone())
    }
}
