//! Parsing and validation of model responses.
//!
//! Raw model output goes through a staged pipeline: JSON extraction,
//! bounded repair, normalization, schema validation, anchor
//! cross-validation, rule checks and metadata extraction. See
//! [`ResponseParser`].

pub mod anchors;
pub mod extract;
pub mod metadata;
pub mod normalize;
pub mod parser;
pub mod repair;
pub mod request;
pub mod result;
pub mod rules;

pub use anchors::{collect_anchors, cross_validate, normalize_anchor, AnchorCheck, ANCHOR_KEYS};
pub use extract::extract_json_candidate;
pub use metadata::{extract_metadata, extractor_for, MetadataExtractor};
pub use normalize::{normalize_value, NormalizeOptions};
pub use parser::{usable_data, ParserOptions, ResponseParser, FALLBACK_WARNING};
pub use repair::{parse_with_repair, repair_json};
pub use request::{LlmParsingRequest, SchemaType, ValidationRule};
pub use result::{ParseOutcome, ParsedResponse};
pub use rules::{apply_rules, RuleFindings};
