//! Identifier helpers: argument validation, length truncation and
//! uniquification of generated database names, and short type names.

use std::fmt::Write;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Default maximum identifier length used when the model does not specify one.
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 128;

/// Reject `""` while letting `None` through ("unset / use default").
pub fn check_null_but_not_empty<'a>(
    value: Option<&'a str>,
    argument: &'static str,
) -> Result<Option<&'a str>> {
    match value {
        Some("") => Err(Error::invalid_argument(
            argument,
            "the string argument cannot be empty",
        )),
        other => Ok(other),
    }
}

/// Reject empty and whitespace-only strings.
pub fn check_not_empty<'a>(value: &'a str, argument: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(
            argument,
            "the string argument cannot be empty",
        ));
    }
    Ok(value)
}

fn decimal_len(mut n: usize) -> usize {
    let mut len = 1;
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}

/// Shorten `name` to at most `max_length` characters.
///
/// Names that fit are returned unchanged. Longer names keep their first
/// `max_length - 1` characters followed by `~`.
#[must_use]
pub fn truncate(name: &str, max_length: usize) -> String {
    truncate_with(name, max_length, 0)
}

/// Like [`truncate`], reserving room for a numeric `uniquifier` suffix
/// (omitted when zero).
#[must_use]
pub fn truncate_with(name: &str, max_length: usize, uniquifier: usize) -> String {
    let suffix_len = if uniquifier == 0 {
        0
    } else {
        decimal_len(uniquifier)
    };
    let max_name_length = max_length.saturating_sub(suffix_len);

    let mut out = String::with_capacity(max_length.min(name.len() + suffix_len));
    if name.chars().count() <= max_name_length {
        out.push_str(name);
    } else if max_name_length > 0 {
        out.extend(name.chars().take(max_name_length - 1));
        out.push('~');
    }

    if uniquifier > 0 {
        let _ = write!(out, "{uniquifier}");
    }
    out
}

/// Truncate `name` and append 1, 2, ... until `is_taken` reports it free.
pub fn uniquify(name: &str, max_length: usize, mut is_taken: impl FnMut(&str) -> bool) -> String {
    let mut candidate = truncate(name, max_length);
    let mut suffix = 1;
    while is_taken(&candidate) {
        candidate = truncate_with(name, max_length, suffix);
        suffix += 1;
    }
    candidate
}

fn module_path_regex() -> &'static Regex {
    static PATH: OnceLock<Regex> = OnceLock::new();
    PATH.get_or_init(|| {
        Regex::new(r"(?:[A-Za-z_][A-Za-z0-9_]*::)+").expect("module path pattern is valid")
    })
}

/// Strip module paths from a Rust type name, including inside generic
/// arguments: `shop::model::Wrapper<shop::Item>` becomes `Wrapper<Item>`.
#[must_use]
pub fn short_name(type_name: &str) -> String {
    module_path_regex().replace_all(type_name, "").into_owned()
}
