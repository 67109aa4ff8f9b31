//! OS applicability expressions
//!
//! Steps can be restricted to particular operating systems with an
//! `osLimits` expression: a `|`-separated list of alternatives where each
//! alternative is either a bare OS id (`ubuntu`) or an id/version pair
//! (`fedora:39`). An empty expression or the literal `all` matches every
//! host. Values coming from `/etc/os-release` are frequently quoted, so
//! both sides of a comparison are washed (trimmed, unquoted, lowercased)
//! before matching.

use serde::Deserialize;

/// An OS applicability expression attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct OsFilter(pub String);

impl OsFilter {
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// Whether this filter places no restriction at all.
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty() || self.0 == "all"
    }

    /// Check the expression against a host's OS id and version.
    ///
    /// Any alternative matching is enough. A bare id matches the id only;
    /// `id:version` requires both to match exactly after washing.
    pub fn matches(&self, os_id: &str, os_version: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let id = wash(os_id);
        let version = wash(os_version);
        self.0.split('|').any(|alt| match alt.split_once(':') {
            Some((want_id, want_version)) => {
                wash(want_id) == id && wash(want_version) == version
            }
            None => wash(alt) == id,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalize a value for comparison: trim whitespace, strip surrounding
/// quotes, lowercase. `/etc/os-release` values arrive in all three shapes.
pub fn wash(input: &str) -> String {
    let trimmed = input.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    unquoted.to_lowercase()
}
