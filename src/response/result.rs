//! Parse results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::SchemaType;

/// Outcome of parsing one model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Whether the response passed every hard gate
    pub is_valid: bool,

    /// Parsed and normalized JSON (`null` when parsing failed)
    pub parsed_data: Value,

    /// Errors found
    pub errors: Vec<String>,

    /// Non-fatal findings
    pub warnings: Vec<String>,

    /// Metrics from the metadata extractor
    pub metadata: Map<String, Value>,

    /// Response type used for extraction
    pub schema_type: Option<SchemaType>,

    /// Anchors referenced and expected
    pub valid_anchor_count: usize,

    /// Anchors expected but missing, plus anchors referenced but unexpected
    pub invalid_anchor_count: usize,
}

impl ParsedResponse {
    /// An invalid response carrying one error.
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            ..Default::default()
        }
    }

    /// Valid and free of errors.
    pub fn is_successful(&self) -> bool {
        self.is_valid && self.errors.is_empty()
    }

    /// Parsed data as an object, if it is one.
    pub fn data_object(&self) -> Option<&Map<String, Value>> {
        self.parsed_data.as_object()
    }
}

/// Which pass of [`parse_with_fallback`](super::ResponseParser::parse_with_fallback)
/// produced the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "response", rename_all = "snake_case")]
pub enum ParseOutcome {
    /// The request as given succeeded
    Primary(ParsedResponse),
    /// The relaxed second pass produced a usable result
    Fallback(ParsedResponse),
    /// Neither pass produced a usable result
    Invalid(ParsedResponse),
}

impl ParseOutcome {
    /// The response, whichever pass produced it.
    pub fn response(&self) -> &ParsedResponse {
        match self {
            ParseOutcome::Primary(r) | ParseOutcome::Fallback(r) | ParseOutcome::Invalid(r) => r,
        }
    }

    /// Take the response.
    pub fn into_response(self) -> ParsedResponse {
        match self {
            ParseOutcome::Primary(r) | ParseOutcome::Fallback(r) | ParseOutcome::Invalid(r) => r,
        }
    }

    /// Check whether the relaxed pass was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ParseOutcome::Fallback(_))
    }

    /// Check whether structured data is available.
    pub fn is_usable(&self) -> bool {
        !matches!(self, ParseOutcome::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_successful() {
        let mut response = ParsedResponse {
            is_valid: true,
            ..Default::default()
        };
        assert!(response.is_successful());

        response.errors.push("Missing required field 'summary'".to_string());
        assert!(!response.is_successful());
        assert!(!ParsedResponse::invalid("bad").is_successful());
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = ParseOutcome::Fallback(ParsedResponse::invalid("x"));
        assert!(outcome.is_fallback());
        assert!(outcome.is_usable());
        assert_eq!(outcome.response().errors, vec!["x"]);
        assert!(!ParseOutcome::Invalid(ParsedResponse::default()).is_usable());
    }
}
