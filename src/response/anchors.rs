//! Anchor references in model responses.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys whose values are anchor references (a string or array of strings).
pub const ANCHOR_KEYS: &[&str] = &[
    "anchor",
    "anchor_id",
    "section_anchor",
    "anchors",
    "section_anchors",
    "related_anchors",
];

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SECTION_ANCHOR_([A-Za-z0-9_\-]+)").expect("anchor marker pattern"));

/// Reduce a full marker or a bare id to the bare anchor id.
pub fn normalize_anchor(reference: &str) -> String {
    let reference = reference.trim();
    if let Some(caps) = MARKER_RE.captures(reference) {
        return caps[1].to_string();
    }
    reference
        .trim_start_matches("<!--")
        .trim_end_matches("-->")
        .trim()
        .to_string()
}

/// Every anchor id referenced anywhere in `data`.
///
/// Values under [`ANCHOR_KEYS`] count, as do literal markers embedded in
/// any string.
pub fn collect_anchors(data: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    walk(data, &mut found);
    found
}

fn walk(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for caps in MARKER_RE.captures_iter(s) {
                found.insert(caps[1].to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, found);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                if ANCHOR_KEYS.contains(&key.as_str()) {
                    insert_references(item, found);
                }
                walk(item, found);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn insert_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            let id = normalize_anchor(s);
            if !id.is_empty() {
                found.insert(id);
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Value::String(_) = item {
                    insert_references(item, found);
                }
            }
        }
        _ => {}
    }
}

/// Comparison of referenced anchors against the expected set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorCheck {
    /// Referenced and expected
    pub valid: usize,
    /// Missing plus unexpected
    pub invalid: usize,
    /// Expected but not referenced
    pub missing: Vec<String>,
    /// Referenced but not expected
    pub unexpected: Vec<String>,
}

/// Cross-validate referenced anchors against the expected ones.
///
/// Both sides are compared as sets of bare ids, so a full marker and its id
/// are the same anchor.
pub fn cross_validate(found: &BTreeSet<String>, expected: &[String]) -> AnchorCheck {
    let expected: BTreeSet<String> = expected
        .iter()
        .map(|a| normalize_anchor(a))
        .filter(|a| !a.is_empty())
        .collect();

    let missing: Vec<String> = expected.difference(found).cloned().collect();
    let unexpected: Vec<String> = found.difference(&expected).cloned().collect();

    AnchorCheck {
        valid: expected.intersection(found).count(),
        invalid: missing.len() + unexpected.len(),
        missing,
        unexpected,
    }
}
