//! Exact-match record filtering

use crate::record::{canonical_json, project, Record};

/// Check whether a record matches a filter exactly.
///
/// A record matches iff its subset of fields named in the filter serializes
/// identically to the filter itself. This is pure equality matching, not
/// partial or range matching: nested values must match in full.
pub fn matches(entry: &Record, filter: &Record) -> bool {
    let keys: Vec<String> = filter.keys().cloned().collect();
    let subset = project(entry, &keys);
    match (canonical_json(&subset), canonical_json(filter)) {
        (Ok(lhs), Ok(rhs)) => lhs == rhs,
        _ => false,
    }
}
