//! Schema definitions, lookup, validation and sample generation.

pub mod definition;
pub mod sample;
pub mod store;
pub mod validate;

pub use definition::{SchemaDef, SchemaNode, ValueKind};
pub use sample::{generate_sample, generate_sample_with_rng};
pub use store::{DirectorySource, EmbeddedSchemas, SchemaSource, SchemaStore};
pub use validate::{
    validate_data_against_schema, validate_node, IssueKind, ValidationIssue, ValidationReport,
};

use serde_json::Value;

use crate::error::Result;

/// Generate a sample response for one of the built-in schemas.
pub fn generate_sample_response(schema_name: &str) -> Result<Value> {
    SchemaStore::with_defaults().generate_sample_response(schema_name)
}
