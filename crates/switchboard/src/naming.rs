//! Widget naming convention.
//!
//! Convention names are a short kind tag followed by an ordinal
//! (`tb000`, `chk12`, `s006`). The ordinal only makes the name unique; it
//! carries no ordering meaning. Names are canonicalized to three-digit
//! padding, so `tb7` and `tb007` address the same handler. The bare name
//! `header` is reserved for the panel header.
//!
//! Anything else resolves to `None`; such widgets are wired manually.

use std::borrow::Cow;
use std::fmt;

/// The closed set of widget kinds the convention recognizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// `tb`: tool button that usually opens an option menu.
    ToolButton,
    /// `b`: push button.
    PushButton,
    /// `lbl`: clickable label.
    Label,
    /// `cmb`: combo box.
    ComboBox,
    /// `chk`: check box or toggle.
    CheckBox,
    /// `rb`: radio button.
    RadioButton,
    /// `s`: spin box.
    SpinBox,
    /// `txt`: line edit.
    LineEdit,
    /// `list`: list widget.
    List,
    /// `header`: the panel header.
    Header,
}

const PREFIXES: [(&str, WidgetKind); 9] = [
    ("tb", WidgetKind::ToolButton),
    ("b", WidgetKind::PushButton),
    ("lbl", WidgetKind::Label),
    ("cmb", WidgetKind::ComboBox),
    ("chk", WidgetKind::CheckBox),
    ("rb", WidgetKind::RadioButton),
    ("s", WidgetKind::SpinBox),
    ("txt", WidgetKind::LineEdit),
    ("list", WidgetKind::List),
];

/// Ordinals are formatted to at least this many digits.
pub const ORDINAL_WIDTH: usize = 3;

const HEADER: &str = "header";

impl WidgetKind {
    /// The name prefix of this kind.
    pub fn prefix(self) -> &'static str {
        if self == WidgetKind::Header {
            return HEADER;
        }
        PREFIXES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(prefix, _)| *prefix)
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        PREFIXES
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, kind)| *kind)
    }
}

/// A decoded convention name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WidgetKey {
    /// The widget kind.
    pub kind: WidgetKind,
    /// The uniqueness ordinal.
    pub ordinal: u32,
}

impl WidgetKey {
    /// Create a key.
    pub fn new(kind: WidgetKind, ordinal: u32) -> Self {
        Self { kind, ordinal }
    }

    /// The canonical name of this key (`tb007`, `header`).
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WidgetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == WidgetKind::Header {
            return f.write_str(HEADER);
        }
        write!(f, "{}{:0width$}", self.kind.prefix(), self.ordinal, width = ORDINAL_WIDTH)
    }
}

/// Decode an object name into `(kind, ordinal)`.
///
/// Returns `None` for names outside the convention; never fails otherwise.
pub fn resolve(name: &str) -> Option<WidgetKey> {
    if name == HEADER {
        return Some(WidgetKey::new(WidgetKind::Header, 0));
    }
    let split = name.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = name.split_at(split);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let kind = WidgetKind::from_prefix(prefix)?;
    let ordinal = digits.parse().ok()?;
    Some(WidgetKey::new(kind, ordinal))
}

/// The handler-table key for a widget or method name.
///
/// Convention names map to their canonical form, so a method `b12` serves
/// widgets named `b12` and `b012`. Any other name is kept verbatim.
pub fn handler_key(name: &str) -> Cow<'_, str> {
    match resolve(name) {
        Some(key) => Cow::Owned(key.canonical()),
        None => Cow::Borrowed(name),
    }
}
