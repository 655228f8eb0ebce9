//! Integration tests for schema lookup, validation and samples.

use std::sync::Arc;

use docanchor::schema::{generate_sample_response, validate_data_against_schema, IssueKind};
use docanchor::{Error, LlmParsingRequest, ResponseParser, SchemaStore};
use serde_json::json;

const BUILTINS: [&str; 4] = [
    "translation_response",
    "contradiction_response",
    "ambiguity_response",
    "general_response",
];

#[test]
fn test_builtin_samples_validate() {
    let store = SchemaStore::with_defaults();
    for name in BUILTINS {
        let schema = store.get_schema(name).unwrap();
        for _ in 0..10 {
            let sample = store.generate_sample_response(name).unwrap();
            let report = validate_data_against_schema(&sample, &schema);
            assert!(report.valid, "{}: {:?}", name, report.errors);
        }
    }
}

#[test]
fn test_samples_survive_strict_parsing() {
    let parser = ResponseParser::new(Arc::new(SchemaStore::with_defaults()));
    for name in BUILTINS {
        let sample = generate_sample_response(name).unwrap();
        let request = LlmParsingRequest::new(sample.to_string())
            .with_schema(name)
            .strict(true);
        let response = parser.parse(&request);
        assert!(response.is_successful(), "{}: {:?}", name, response.errors);
    }
}

#[test]
fn test_missing_required_field_is_named() {
    let store = SchemaStore::with_defaults();
    let report = store
        .validate(&json!({"section_translations": []}), "translation_response")
        .unwrap();
    assert!(!report.valid);
    assert!(report.has_missing_required());
    assert!(report
        .error_messages()
        .iter()
        .any(|m| m.contains("document_summary")));
}

#[test]
fn test_wrong_type_is_reported() {
    let store = SchemaStore::with_defaults();
    let report = store
        .validate(&json!({"summary": 42}), "general_response")
        .unwrap();
    assert!(!report.valid);
    assert_eq!(report.errors[0].kind, IssueKind::TypeMismatch);
}

#[test]
fn test_conforming_data_is_valid() {
    let store = SchemaStore::with_defaults();
    let data = json!({
        "contradictions_found": [{
            "type": "numerical",
            "severity": "high",
            "description": "Section 2 says 30 days, section 5 says 60 days",
            "section_anchors": ["section_2_oplata", "section_5_rokovi"],
            "confidence": 0.8
        }],
        "summary": "One contradiction",
        "confidence": 0.8
    });
    let report = store.validate(&data, "contradiction_response").unwrap();
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn test_enum_violation() {
    let store = SchemaStore::with_defaults();
    let data = json!({
        "ambiguities_found": [{
            "type": "lexical",
            "risk_level": "extreme",
            "description": "Unclear term"
        }]
    });
    let report = store.validate(&data, "ambiguity_response").unwrap();
    assert!(!report.valid);
    assert_eq!(report.errors[0].kind, IssueKind::Constraint);
}

#[test]
fn test_unknown_schema() {
    let err = SchemaStore::with_defaults().get_schema("poetry").unwrap_err();
    assert!(matches!(err, Error::SchemaNotFound(name) if name == "poetry"));
    assert!(generate_sample_response("poetry").is_err());
}

#[test]
fn test_directory_schemas_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("memo_response.json"),
        r#"{"type": "object", "properties": {"memo": {"type": "string"}}}"#,
    )
    .unwrap();

    let store = SchemaStore::with_directory(dir.path());
    let names = store.list_schemas();
    assert!(names.contains(&"memo_response".to_string()));
    assert!(names.contains(&"general_response".to_string()));
}
