//! Validation of JSON data against a schema tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::definition::{join, SchemaDef, SchemaNode, ValueKind};

/// Category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required field is absent
    MissingRequired,
    /// The value has the wrong type
    TypeMismatch,
    /// Length, range, item count or enum violated
    Constraint,
}

/// One validation error with the dotted path of the offending field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path (`a.b[2].c`); empty for the root
    pub path: String,
    /// Error category
    pub kind: IssueKind,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of validating one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when there are no errors
    pub valid: bool,
    /// Contract violations
    pub errors: Vec<ValidationIssue>,
    /// Unknown properties and other non-fatal findings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Check if any required field was missing.
    pub fn has_missing_required(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.kind == IssueKind::MissingRequired)
    }

    /// Error messages in order.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    fn error(&mut self, path: &str, kind: IssueKind, message: String) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            kind,
            message,
        });
    }
}

/// Validate `data` against `schema`.
///
/// Unknown properties produce warnings, never errors. A numeric value
/// satisfies both `number` and `integer`.
pub fn validate_data_against_schema(data: &Value, schema: &SchemaDef) -> ValidationReport {
    validate_node(data, &schema.root)
}

/// Validate `data` against a bare schema node.
pub fn validate_node(data: &Value, node: &SchemaNode) -> ValidationReport {
    let mut report = ValidationReport::default();
    check(data, node, "", true, &mut report);
    report.valid = report.errors.is_empty();
    report
}

fn check(
    value: &Value,
    node: &SchemaNode,
    path: &str,
    required: bool,
    report: &mut ValidationReport,
) {
    // Optional fields explicitly set to null are treated as absent.
    if value.is_null() && !required && node.kind != Some(ValueKind::Null) {
        return;
    }

    if let Some(kind) = node.effective_kind() {
        if !kind.matches(value) {
            report.error(
                path,
                IssueKind::TypeMismatch,
                format!(
                    "Field '{}' has wrong type: expected {}, got {}",
                    display_path(path),
                    kind,
                    ValueKind::of(value)
                ),
            );
            return;
        }
    }

    if let Some(allowed) = &node.allowed {
        if !allowed.contains(value) {
            let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            report.error(
                path,
                IssueKind::Constraint,
                format!(
                    "Field '{}' must be one of [{}], got {}",
                    display_path(path),
                    options.join(", "),
                    value
                ),
            );
        }
    }

    match value {
        Value::String(s) => check_string(s, node, path, report),
        Value::Number(n) => {
            if let Some(n) = n.as_f64() {
                check_number(n, node, path, report);
            }
        }
        Value::Array(items) => check_array(items, node, path, report),
        Value::Object(map) => {
            for name in &node.required {
                if !map.contains_key(name) {
                    let field = join(path, name);
                    report.error(
                        &field,
                        IssueKind::MissingRequired,
                        format!("Missing required field '{}'", field),
                    );
                }
            }
            for (name, child_value) in map {
                let field = join(path, name);
                match node.properties.get(name) {
                    Some(child) => {
                        check(child_value, child, &field, node.is_required(name), report)
                    }
                    None if !node.properties.is_empty() => {
                        report.warnings.push(format!("Unknown property '{}'", field));
                    }
                    None => {}
                }
            }
        }
        Value::Null | Value::Bool(_) => {}
    }
}

fn check_string(s: &str, node: &SchemaNode, path: &str, report: &mut ValidationReport) {
    let length = s.chars().count();
    if let Some(min) = node.min_length {
        if length < min {
            report.error(
                path,
                IssueKind::Constraint,
                format!(
                    "Field '{}' is too short: {} characters, minimum {}",
                    display_path(path),
                    length,
                    min
                ),
            );
        }
    }
    if let Some(max) = node.max_length {
        if length > max {
            report.error(
                path,
                IssueKind::Constraint,
                format!(
                    "Field '{}' is too long: {} characters, maximum {}",
                    display_path(path),
                    length,
                    max
                ),
            );
        }
    }
}

fn check_number(n: f64, node: &SchemaNode, path: &str, report: &mut ValidationReport) {
    if let Some(min) = node.minimum {
        if n < min {
            report.error(
                path,
                IssueKind::Constraint,
                format!("Field '{}' is {} but minimum is {}", display_path(path), n, min),
            );
        }
    }
    if let Some(max) = node.maximum {
        if n > max {
            report.error(
                path,
                IssueKind::Constraint,
                format!("Field '{}' is {} but maximum is {}", display_path(path), n, max),
            );
        }
    }
}

fn check_array(items: &[Value], node: &SchemaNode, path: &str, report: &mut ValidationReport) {
    if let Some(min) = node.min_items {
        if items.len() < min {
            report.error(
                path,
                IssueKind::Constraint,
                format!(
                    "Field '{}' has {} items, minimum {}",
                    display_path(path),
                    items.len(),
                    min
                ),
            );
        }
    }
    if let Some(max) = node.max_items {
        if items.len() > max {
            report.error(
                path,
                IssueKind::Constraint,
                format!(
                    "Field '{}' has {} items, maximum {}",
                    display_path(path),
                    items.len(),
                    max
                ),
            );
        }
    }
    if let Some(item_node) = &node.items {
        for (i, item) in items.iter().enumerate() {
            check(item, item_node, &format!("{}[{}]", path, i), true, report);
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaDef {
        SchemaDef::from_value(
            "test",
            json!({
                "type": "object",
                "required": ["summary", "items"],
                "properties": {
                    "summary": {"type": "string", "minLength": 3, "maxLength": 20},
                    "count": {"type": "integer", "minimum": 0, "maximum": 10},
                    "level": {"type": "string", "enum": ["high", "low"]},
                    "items": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "required": ["anchor"],
                            "properties": {"anchor": {"type": "string"}}
                        }
                    }
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_conforming_data() {
        let data = json!({"summary": "fine", "count": 3, "items": [{"anchor": "a"}]});
        let report = validate_data_against_schema(&data, &schema());
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let data = json!({"items": [{"anchor": "a"}]});
        let report = validate_data_against_schema(&data, &schema());
        assert!(!report.valid);
        assert!(report.has_missing_required());
        assert!(report.errors[0].message.contains("summary"));
    }

    #[test]
    fn test_type_mismatch() {
        let data = json!({"summary": 42, "items": []});
        let report = validate_data_against_schema(&data, &schema());
        assert!(report.errors.iter().any(|e| e.kind == IssueKind::TypeMismatch
            && e.path == "summary"
            && e.message.contains("expected string")));
    }

    #[test]
    fn test_nested_errors_carry_path() {
        let data = json!({"summary": "fine", "items": [{"anchor": "a"}, {"other": 1}]});
        let report = validate_data_against_schema(&data, &schema());
        let missing = &report.errors[0];
        assert_eq!(missing.kind, IssueKind::MissingRequired);
        assert_eq!(missing.path, "items[1].anchor");
        assert_eq!(report.warnings, vec!["Unknown property 'items[1].other'"]);
    }

    #[test]
    fn test_constraints() {
        let data = json!({
            "summary": "no",
            "count": 11,
            "level": "medium",
            "items": []
        });
        let report = validate_data_against_schema(&data, &schema());
        let constraint_errors = report
            .errors
            .iter()
            .filter(|e| e.kind == IssueKind::Constraint)
            .count();
        assert_eq!(constraint_errors, 4);
    }

    #[test]
    fn test_number_satisfies_integer() {
        let data = json!({"summary": "fine", "count": 2.5, "items": [{"anchor": "a"}]});
        assert!(validate_data_against_schema(&data, &schema()).valid);
    }

    #[test]
    fn test_unknown_property_is_warning() {
        let data = json!({"summary": "fine", "items": [{"anchor": "a"}], "extra": true});
        let report = validate_data_against_schema(&data, &schema());
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_optional_null_is_absent() {
        let data = json!({"summary": "fine", "count": null, "items": [{"anchor": "a"}]});
        assert!(validate_data_against_schema(&data, &schema()).valid);
    }
}
