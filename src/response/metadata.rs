//! Per-type metrics extracted from parsed responses.

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::request::SchemaType;

/// Turns parsed response data into summary metrics.
pub trait MetadataExtractor: Send + Sync {
    /// Response type this extractor handles.
    fn schema_type(&self) -> SchemaType;

    /// Type-specific metrics.
    fn extract(&self, data: &Value) -> Map<String, Value>;
}

/// Metrics for section-by-section translations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationMetadata;

/// Metrics for contradiction reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContradictionMetadata;

/// Metrics for ambiguity reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbiguityMetadata;

/// Metrics for free-form responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralMetadata;

/// Extractor for `schema_type`.
pub fn extractor_for(schema_type: SchemaType) -> &'static dyn MetadataExtractor {
    match schema_type {
        SchemaType::Translation => &TranslationMetadata,
        SchemaType::Contradiction => &ContradictionMetadata,
        SchemaType::Ambiguity => &AmbiguityMetadata,
        SchemaType::General => &GeneralMetadata,
    }
}

/// Type-specific metrics plus the common fields `timestamp`, `data_size`,
/// `has_warnings` and `warnings_count`.
pub fn extract_metadata(schema_type: SchemaType, data: &Value, warnings: &[String]) -> Map<String, Value> {
    let mut metadata = extractor_for(schema_type).extract(data);
    metadata.insert("schema_type".to_string(), json!(schema_type.as_str()));
    metadata.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
    metadata.insert("data_size".to_string(), json!(data_size(data)));
    metadata.insert("has_warnings".to_string(), json!(!warnings.is_empty()));
    metadata.insert("warnings_count".to_string(), json!(warnings.len()));
    metadata
}

/// Length in bytes of the compact JSON encoding.
fn data_size(data: &Value) -> usize {
    serde_json::to_string(data).map(|s| s.len()).unwrap_or(0)
}

impl MetadataExtractor for TranslationMetadata {
    fn schema_type(&self) -> SchemaType {
        SchemaType::Translation
    }

    fn extract(&self, data: &Value) -> Map<String, Value> {
        let mut metadata = Map::new();

        let scores: Vec<f64> = ["clarity_score", "completeness_score"]
            .iter()
            .filter_map(|key| data.get(key).and_then(Value::as_f64))
            .collect();
        if !scores.is_empty() {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            metadata.insert("overall_score".to_string(), json!(mean));
        }

        let sections = array(data, "section_translations");
        let with_summary = sections
            .iter()
            .filter(|s| has_text(s, "summary") || has_text(s, "simplified_text"))
            .count();
        metadata.insert(
            "sections_count".to_string(),
            json!({"total": sections.len(), "with_summary": with_summary}),
        );

        let mut terms = array(data, "terms_preserved");
        if terms.is_empty() {
            terms = array(data, "legal_terms");
        }
        metadata.insert(
            "terms_preserved".to_string(),
            json!({
                "total": terms.len(),
                "with_explanation": terms.iter().filter(|t| has_text(t, "explanation")).count(),
                "with_context": terms.iter().filter(|t| has_text(t, "context")).count(),
            }),
        );

        let concepts = array(data, "key_concepts");
        metadata.insert(
            "key_concepts".to_string(),
            json!({
                "total": concepts.len(),
                "importance_distribution": distribution(concepts, "importance", &["high", "medium", "low"]),
            }),
        );

        let original = data.get("original_length").and_then(Value::as_f64);
        let simplified = data.get("simplified_length").and_then(Value::as_f64);
        if let (Some(original), Some(simplified)) = (original, simplified) {
            if original > 0.0 {
                metadata.insert(
                    "complexity_metrics".to_string(),
                    json!({"compression_ratio": simplified / original}),
                );
            }
        }

        pass_confidence(data, &mut metadata);
        metadata
    }
}

impl MetadataExtractor for ContradictionMetadata {
    fn schema_type(&self) -> SchemaType {
        SchemaType::Contradiction
    }

    fn extract(&self, data: &Value) -> Map<String, Value> {
        let mut metadata = Map::new();
        let found = array(data, "contradictions_found");

        metadata.insert("total_contradictions".to_string(), json!(found.len()));
        metadata.insert(
            "type_distribution".to_string(),
            distribution(
                found,
                "type",
                &["logical", "numerical", "temporal", "legal", "terminological", "other"],
            ),
        );
        metadata.insert(
            "severity_distribution".to_string(),
            distribution(found, "severity", &["critical", "high", "medium", "low"]),
        );

        pass_confidence(data, &mut metadata);
        metadata
    }
}

impl MetadataExtractor for AmbiguityMetadata {
    fn schema_type(&self) -> SchemaType {
        SchemaType::Ambiguity
    }

    fn extract(&self, data: &Value) -> Map<String, Value> {
        let mut metadata = Map::new();
        let found = array(data, "ambiguities_found");

        metadata.insert("total_ambiguities".to_string(), json!(found.len()));
        metadata.insert(
            "type_distribution".to_string(),
            distribution(
                found,
                "type",
                &[
                    "lexical",
                    "syntactic",
                    "semantic",
                    "referential",
                    "scope",
                    "vague_term",
                    "other",
                ],
            ),
        );
        metadata.insert(
            "risk_distribution".to_string(),
            distribution(found, "risk_level", &["high", "medium", "low"]),
        );

        pass_confidence(data, &mut metadata);
        metadata
    }
}

impl MetadataExtractor for GeneralMetadata {
    fn schema_type(&self) -> SchemaType {
        SchemaType::General
    }

    fn extract(&self, data: &Value) -> Map<String, Value> {
        let mut metadata = Map::new();
        let recommendations = array(data, "recommendations");

        metadata.insert("has_summary".to_string(), json!(has_text(data, "summary")));
        metadata.insert(
            "has_details".to_string(),
            json!(data.get("details").is_some_and(|d| !d.is_null())),
        );
        metadata.insert("findings_count".to_string(), json!(array(data, "findings").len()));
        metadata.insert("recommendations_count".to_string(), json!(recommendations.len()));
        metadata.insert(
            "priority_distribution".to_string(),
            distribution(recommendations, "priority", &["high", "medium", "low"]),
        );

        pass_confidence(data, &mut metadata);
        metadata
    }
}

fn array<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn has_text(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// Count `items[*][key]` over `categories`. Values outside the list are
/// counted under their own name.
fn distribution(items: &[Value], key: &str, categories: &[&str]) -> Value {
    let mut counts = Map::new();
    for category in categories {
        counts.insert(category.to_string(), json!(0));
    }
    for value in items.iter().filter_map(|item| item.get(key).and_then(Value::as_str)) {
        let name = value.trim().to_lowercase();
        let current = counts.get(&name).and_then(Value::as_u64).unwrap_or(0);
        counts.insert(name, json!(current + 1));
    }
    Value::Object(counts)
}

fn pass_confidence(data: &Value, metadata: &mut Map<String, Value>) {
    if let Some(confidence) = data.get("confidence").filter(|c| c.is_number()) {
        metadata.insert("confidence".to_string(), confidence.clone());
    }
}
