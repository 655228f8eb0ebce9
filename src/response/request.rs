//! Parse requests and the enums they are configured with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Kind of model response, selecting the metadata extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    /// Section-by-section translation
    Translation,
    /// Contradictions between sections
    Contradiction,
    /// Ambiguous wording
    Ambiguity,
    /// Anything else
    General,
}

impl SchemaType {
    /// Short name (`translation`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Translation => "translation",
            SchemaType::Contradiction => "contradiction",
            SchemaType::Ambiguity => "ambiguity",
            SchemaType::General => "general",
        }
    }

    /// Name of the matching built-in schema.
    pub fn schema_name(&self) -> &'static str {
        match self {
            SchemaType::Translation => "translation_response",
            SchemaType::Contradiction => "contradiction_response",
            SchemaType::Ambiguity => "ambiguity_response",
            SchemaType::General => "general_response",
        }
    }

    /// Whether responses of this type reference section anchors.
    pub fn carries_anchors(&self) -> bool {
        !matches!(self, SchemaType::General)
    }

    /// Guess the type from the response shape.
    pub fn detect(data: &Value) -> Self {
        let has = |key: &str| data.get(key).is_some();
        if has("section_translations") {
            SchemaType::Translation
        } else if has("contradictions_found") {
            SchemaType::Contradiction
        } else if has("ambiguities_found") {
            SchemaType::Ambiguity
        } else {
            SchemaType::General
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = Error;

    /// Accepts the short name or the schema name (`translation_response`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.strip_suffix("_response").unwrap_or(&name) {
            "translation" => Ok(SchemaType::Translation),
            "contradiction" => Ok(SchemaType::Contradiction),
            "ambiguity" => Ok(SchemaType::Ambiguity),
            "general" => Ok(SchemaType::General),
            _ => Err(Error::Other(format!("Unknown schema type: {}", s))),
        }
    }
}

/// Extra checks applied after schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    /// Error when the response references no anchors
    AnchorsRequired,
    /// Warning when no confidence value appears anywhere
    ConfidenceRequired,
    /// Warning when there is no non-empty summary
    SummaryRequired,
    /// Error when the parsed object has no fields
    NonEmpty,
}

impl ValidationRule {
    /// Rule name as used in requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::AnchorsRequired => "anchors_required",
            ValidationRule::ConfidenceRequired => "confidence_required",
            ValidationRule::SummaryRequired => "summary_required",
            ValidationRule::NonEmpty => "non_empty",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "anchors_required" => Ok(ValidationRule::AnchorsRequired),
            "confidence_required" => Ok(ValidationRule::ConfidenceRequired),
            "summary_required" => Ok(ValidationRule::SummaryRequired),
            "non_empty" => Ok(ValidationRule::NonEmpty),
            _ => Err(Error::Other(format!("Unknown validation rule: {}", s))),
        }
    }
}

/// A raw model reply plus what it is expected to contain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmParsingRequest {
    /// Text exactly as returned by the model
    pub raw_response: String,

    /// Schema name to validate against
    #[serde(default)]
    pub expected_schema: Option<String>,

    /// Response type; detected from the data when absent
    #[serde(default)]
    pub schema_type: Option<SchemaType>,

    /// Anchor ids the response should reference
    #[serde(default)]
    pub original_anchors: Vec<String>,

    /// Extra rule checks
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,

    /// Treat missing required fields as fatal
    #[serde(default)]
    pub strict_validation: bool,
}

impl LlmParsingRequest {
    /// Create a request for a raw response.
    pub fn new(raw_response: impl Into<String>) -> Self {
        Self {
            raw_response: raw_response.into(),
            ..Default::default()
        }
    }

    /// Validate against a named schema.
    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.expected_schema = Some(name.into());
        self
    }

    /// Set the response type.
    pub fn with_schema_type(mut self, schema_type: SchemaType) -> Self {
        self.schema_type = Some(schema_type);
        self
    }

    /// Set the anchors the response should reference.
    pub fn with_original_anchors<I, S>(mut self, anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.original_anchors = anchors.into_iter().map(Into::into).collect();
        self
    }

    /// Add a rule check.
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        if !self.validation_rules.contains(&rule) {
            self.validation_rules.push(rule);
        }
        self
    }

    /// Enable or disable strict validation.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }
}
