use crate::error::{Result, SwitchboardError};

/// Most names a single range item may expand to.
pub const MAX_RANGE_SPAN: u32 = 1000;

/// Expand a widget range expression into widget names.
///
/// Items are separated by commas or whitespace. An item `s006-8` or
/// `s006-s008` expands to `s006, s007, s008`; the zero padding follows the
/// start token. Items without a dash are taken verbatim. An item spanning
/// more than [`MAX_RANGE_SPAN`] names is rejected.
///
/// ```
/// use switchboard::sync::expand_range;
///
/// assert_eq!(
///     expand_range("s006-8, chk001").unwrap(),
///     vec!["s006", "s007", "s008", "chk001"]
/// );
/// ```
pub fn expand_range(expr: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for item in expr
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
    {
        match item.split_once('-') {
            Some((start, end)) => expand_item(item, start, end, &mut names)?,
            None => names.push(item.to_string()),
        }
    }
    Ok(names)
}

fn expand_item(item: &str, start: &str, end: &str, out: &mut Vec<String>) -> Result<()> {
    let invalid = || SwitchboardError::InvalidRange(item.to_string());

    let (prefix, start_digits) = split_digits(start);
    if start_digits.is_empty() {
        return Err(invalid());
    }
    let end_digits = match end.strip_prefix(prefix) {
        Some(digits) if !prefix.is_empty() => digits,
        _ => end,
    };
    if end_digits.is_empty() || !end_digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let first: u32 = start_digits.parse().map_err(|_| invalid())?;
    let last: u32 = end_digits.parse().map_err(|_| invalid())?;
    if last < first || last - first >= MAX_RANGE_SPAN {
        return Err(invalid());
    }
    let width = start_digits.len();
    out.extend((first..=last).map(|n| format!("{prefix}{n:0width$}")));
    Ok(())
}

fn split_digits(token: &str) -> (&str, &str) {
    let split = token
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    token.split_at(split)
}
