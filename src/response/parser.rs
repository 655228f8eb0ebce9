//! Staged parsing of model responses.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{json, Value};

use super::anchors::{collect_anchors, cross_validate};
use super::extract::extract_json_candidate;
use super::metadata::extract_metadata;
use super::normalize::{normalize_value, NormalizeOptions};
use super::repair::parse_with_repair;
use super::request::{LlmParsingRequest, SchemaType};
use super::result::{ParseOutcome, ParsedResponse};
use super::rules::apply_rules;
use crate::error::Error;
use crate::schema::{validate_data_against_schema, SchemaStore};

/// Warning attached to results of the relaxed second pass.
pub const FALLBACK_WARNING: &str = "fallback parsing used";

/// Options for [`ResponseParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Inputs longer than this many bytes are never repaired
    pub max_repair_input: usize,

    /// Turn numeric-looking strings into numbers
    pub coerce_numeric_strings: bool,

    /// Trim strings and collapse whitespace runs
    pub collapse_whitespace: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_repair_input: 1024 * 1024,
            coerce_numeric_strings: true,
            collapse_whitespace: true,
        }
    }
}

impl ParserOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repair size limit in bytes.
    pub fn with_max_repair_input(mut self, bytes: usize) -> Self {
        self.max_repair_input = bytes;
        self
    }

    /// Enable or disable numeric string coercion.
    pub fn with_numeric_coercion(mut self, enabled: bool) -> Self {
        self.coerce_numeric_strings = enabled;
        self
    }

    /// Enable or disable whitespace collapsing.
    pub fn with_whitespace_collapse(mut self, enabled: bool) -> Self {
        self.collapse_whitespace = enabled;
        self
    }

    fn normalize(&self) -> NormalizeOptions {
        NormalizeOptions {
            coerce_numeric_strings: self.coerce_numeric_strings,
            collapse_whitespace: self.collapse_whitespace,
        }
    }
}

/// Turns raw model output into validated, structured data.
///
/// Parsing never fails: problems are reported through
/// [`ParsedResponse::is_valid`], `errors` and `warnings`.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    store: Arc<SchemaStore>,
    options: ParserOptions,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(Arc::new(SchemaStore::with_defaults()))
    }
}

impl ResponseParser {
    /// Create a parser resolving schemas through `store`.
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self {
            store,
            options: ParserOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Parser options.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Schema store used for validation.
    pub fn store(&self) -> &Arc<SchemaStore> {
        &self.store
    }

    /// Parse one response.
    pub fn parse(&self, request: &LlmParsingRequest) -> ParsedResponse {
        match catch_unwind(AssertUnwindSafe(|| self.run(request))) {
            Ok(response) => response,
            Err(payload) => {
                let err = Error::from_panic(payload);
                log::warn!("Response parsing aborted: {}", err);
                let mut response = ParsedResponse::invalid(err.to_string());
                response
                    .metadata
                    .insert("error".to_string(), json!(err.to_string()));
                response.schema_type = request.schema_type;
                response
            }
        }
    }

    /// Parse one response, retrying once without schema or strictness when
    /// the request as given does not succeed.
    ///
    /// The retry only happens for strict requests or requests naming a
    /// schema; otherwise there is nothing to relax.
    pub fn parse_with_fallback(&self, request: &LlmParsingRequest) -> ParseOutcome {
        let primary = self.parse(request);
        if primary.is_successful() {
            return ParseOutcome::Primary(primary);
        }

        let relaxable = request.strict_validation || request.expected_schema.is_some();
        if !relaxable {
            return if primary.is_valid {
                ParseOutcome::Primary(primary)
            } else {
                ParseOutcome::Invalid(primary)
            };
        }

        let mut relaxed = request.clone();
        relaxed.strict_validation = false;
        relaxed.expected_schema = None;

        let mut fallback = self.parse(&relaxed);
        if !fallback.is_valid {
            log::warn!("Fallback parsing failed: {}", fallback.errors.join("; "));
            return ParseOutcome::Invalid(primary);
        }

        log::warn!("Primary parsing failed, using fallback result");
        fallback.warnings.push(FALLBACK_WARNING.to_string());
        fallback
            .metadata
            .insert("fallback_used".to_string(), json!(true));
        fallback
            .metadata
            .insert("primary_errors".to_string(), json!(primary.errors));
        fallback.metadata.insert(
            "warnings_count".to_string(),
            json!(fallback.warnings.len()),
        );
        fallback
            .metadata
            .insert("has_warnings".to_string(), json!(true));
        ParseOutcome::Fallback(fallback)
    }

    fn run(&self, request: &LlmParsingRequest) -> ParsedResponse {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut is_valid = true;

        // Extract and parse
        let candidate = extract_json_candidate(&request.raw_response);
        let (value, repaired) = match parse_with_repair(&candidate, self.options.max_repair_input) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Unparseable response: {}", e);
                let mut response = ParsedResponse::invalid(e.to_string());
                response.schema_type = request.schema_type;
                response.metadata.insert(
                    "raw_length".to_string(),
                    json!(request.raw_response.len()),
                );
                return response;
            }
        };
        if repaired {
            warnings.push("Malformed JSON was repaired before parsing".to_string());
        }

        let data = normalize_value(value, self.options.normalize());

        // Schema validation
        if let Some(name) = request.expected_schema.as_deref() {
            match self.store.get_schema(name) {
                Ok(schema) => {
                    let report = validate_data_against_schema(&data, &schema);
                    log::debug!(
                        "Schema '{}': {} errors, {} warnings",
                        name,
                        report.errors.len(),
                        report.warnings.len()
                    );
                    if request.strict_validation {
                        if report.has_missing_required() {
                            is_valid = false;
                        }
                        errors.extend(report.error_messages());
                    } else {
                        warnings.extend(report.error_messages());
                    }
                    warnings.extend(report.warnings);
                }
                Err(e) if request.strict_validation => {
                    is_valid = false;
                    errors.push(e.to_string());
                }
                Err(e) => warnings.push(e.to_string()),
            }
        }

        // Anchors
        let schema_type = request
            .schema_type
            .unwrap_or_else(|| SchemaType::detect(&data));
        let anchors = collect_anchors(&data);
        let mut valid_anchor_count = 0;
        let mut invalid_anchor_count = 0;
        let mut anchor_metadata = None;

        if schema_type.carries_anchors() && !request.original_anchors.is_empty() {
            let check = cross_validate(&anchors, &request.original_anchors);
            log::debug!(
                "Anchors: {} valid, {} invalid",
                check.valid,
                check.invalid
            );
            if !check.missing.is_empty() {
                warnings.push(format!(
                    "Anchors missing from response: {}",
                    check.missing.join(", ")
                ));
            }
            if !check.unexpected.is_empty() {
                warnings.push(format!(
                    "Unknown anchors in response: {}",
                    check.unexpected.join(", ")
                ));
            }
            valid_anchor_count = check.valid;
            invalid_anchor_count = check.invalid;
            anchor_metadata = Some(check);
        }

        // Rules
        let findings = apply_rules(&request.validation_rules, &data, &anchors);
        errors.extend(findings.errors);
        warnings.extend(findings.warnings);

        // Metadata
        let mut metadata = extract_metadata(schema_type, &data, &warnings);
        metadata.insert("repaired".to_string(), json!(repaired));
        metadata.insert("anchors_referenced".to_string(), json!(anchors.len()));
        if let Some(check) = anchor_metadata {
            metadata.insert("missing_anchors".to_string(), json!(check.missing));
            metadata.insert("unexpected_anchors".to_string(), json!(check.unexpected));
        }

        ParsedResponse {
            is_valid,
            parsed_data: data,
            errors,
            warnings,
            metadata,
            schema_type: Some(schema_type),
            valid_anchor_count,
            invalid_anchor_count,
        }
    }
}

/// Parsed data, or `Value::Null` when the outcome is invalid.
pub fn usable_data(outcome: &ParseOutcome) -> &Value {
    static NULL: Value = Value::Null;
    if outcome.is_usable() {
        &outcome.response().parsed_data
    } else {
        &NULL
    }
}
