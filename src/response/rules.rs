//! Rule checks applied after schema validation.

use std::collections::BTreeSet;

use serde_json::Value;

use super::request::ValidationRule;

/// Errors and warnings raised by rule checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFindings {
    /// Hard failures
    pub errors: Vec<String>,
    /// Soft findings
    pub warnings: Vec<String>,
}

/// Apply `rules` to parsed data and the anchors it references.
pub fn apply_rules(rules: &[ValidationRule], data: &Value, anchors: &BTreeSet<String>) -> RuleFindings {
    let mut findings = RuleFindings::default();

    for rule in rules {
        match rule {
            ValidationRule::AnchorsRequired => {
                if anchors.is_empty() {
                    findings
                        .errors
                        .push("Response references no section anchors".to_string());
                }
            }
            ValidationRule::ConfidenceRequired => {
                if !has_confidence(data) {
                    findings
                        .warnings
                        .push("No confidence value found in response".to_string());
                }
            }
            ValidationRule::SummaryRequired => {
                if !has_summary(data) {
                    findings
                        .warnings
                        .push("Response has no summary".to_string());
                }
            }
            ValidationRule::NonEmpty => {
                if is_empty(data) {
                    findings
                        .errors
                        .push("Response contains no data".to_string());
                }
            }
        }
    }

    findings
}

/// Check for a numeric `confidence` (or `*_confidence`) anywhere.
pub fn has_confidence(data: &Value) -> bool {
    match data {
        Value::Object(map) => map.iter().any(|(key, value)| {
            ((key == "confidence" || key.ends_with("_confidence")) && value.is_number())
                || has_confidence(value)
        }),
        Value::Array(items) => items.iter().any(has_confidence),
        _ => false,
    }
}

fn has_summary(data: &Value) -> bool {
    ["summary", "document_summary"].iter().any(|key| {
        data.get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    })
}

fn is_empty(data: &Value) -> bool {
    match data {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Null => true,
        _ => false,
    }
}
