//! Local name and folder construction.

use std::fmt::Write;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;

/// Provider-side duplicate marker: `name (3).ext`.
///
/// Heuristic: a name that genuinely ends in ` (digits)` before its
/// extension is indistinguishable from a provider duplicate and gets
/// stripped too.
static DUPLICATE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*) \(\d+\)(\..*)$").expect("duplicate suffix pattern is valid")
});

/// Remove a provider duplicate marker, e.g. `IMG_1 (2).jpg` → `IMG_1.jpg`.
pub fn strip_duplicate_suffix(name: &str) -> String {
    match DUPLICATE_SUFFIX.captures(name) {
        Some(caps) => format!("{}{}", &caps[1], &caps[2]),
        None => name.to_string(),
    }
}

/// Apply a duplicate number: 0 leaves the name alone, n > 0 inserts
/// ` (n)` before the extension.
pub fn with_duplicate_suffix(name: &str, duplicate_number: u32) -> String {
    if duplicate_number == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = name.split_at(dot);
            format!("{} ({}){}", stem, duplicate_number, ext)
        }
        _ => format!("{} ({})", name, duplicate_number),
    }
}

/// Build the relative folder for an item from its create date.
///
/// `layout` is a date format such as `"%Y/%m"`; `"none"` (any case)
/// disables date folders and returns an empty string.
pub fn date_folder(layout: &str, date: &DateTime<Utc>) -> String {
    if layout.eq_ignore_ascii_case("none") {
        return String::new();
    }
    let expanded = expand_date_format(layout, date);
    expanded
        .split('/')
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Expand `%Y`, `%m` and `%d` in a single pass; unknown tokens are kept.
fn expand_date_format(format_str: &str, date: &DateTime<Utc>) -> String {
    let mut result = String::with_capacity(format_str.len() + 8);
    let mut chars = format_str.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('Y') => {
                chars.next();
                let _ = write!(result, "{:04}", date.year());
            }
            Some('m') => {
                chars.next();
                let _ = write!(result, "{:02}", date.month());
            }
            Some('d') => {
                chars.next();
                let _ = write!(result, "{:02}", date.day());
            }
            _ => result.push(c),
        }
    }
    result
}
