//! Environment-string rendering
//!
//! Manifest fields eligible for substitution are rewritten before use:
//! `${NAME}` tokens (or `%NAME%` when the host is Windows) become the
//! process environment's value for `NAME`, with unresolved tokens
//! rendering as the empty string, and a leading `~` becomes the invoking
//! user's home directory.

use std::sync::LazyLock;

use regex::Regex;

use crate::facts::Facts;

static UNIX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());
static WINDOWS_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%([^%]+)%").unwrap());

/// Rewrite environment tokens and a leading `~` in a manifest field.
pub fn render_env(input: &str, facts: &Facts) -> String {
    let token = if facts.os_type == "windows" {
        &*WINDOWS_TOKEN
    } else {
        &*UNIX_TOKEN
    };
    let expanded = token.replace_all(input, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    });
    match expanded.strip_prefix('~') {
        Some(rest) => format!(
            "{}{}",
            facts.home.display(),
            rest
        ),
        None => expanded.into_owned(),
    }
}

/// Pick the value matching the host's package manager from a
/// `base|manager=value` expression.
///
/// Entries with a `manager=` prefix apply only on that manager; the bare
/// entry is the fallback. An expression without `|` passes through as-is.
pub fn manager_value(input: &str, facts: &Facts) -> String {
    if !input.contains('|') {
        return input.to_string();
    }
    if facts.package_manager.is_empty() {
        log::error!("cannot select a manager-specific value without a known package manager");
        return String::new();
    }
    let mut base = "";
    let mut specific = "";
    for entry in input.split('|') {
        match entry.split_once('=') {
            Some((manager, value)) if manager == facts.package_manager => specific = value,
            Some(_) => {}
            None => base = entry,
        }
    }
    if specific.is_empty() {
        base.to_string()
    } else {
        specific.to_string()
    }
}
