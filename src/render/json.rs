//! JSON rendering for analysis and parse results.

use serde::Serialize;

use crate::error::Result;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any result type to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StructureAnalysisResult;
    use crate::response::ParsedResponse;

    #[test]
    fn test_to_json_pretty() {
        let result = StructureAnalysisResult::empty("doc_abc");
        let json = to_json(&result, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"document_id\""));
        assert!(json.contains("doc_abc"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let response = ParsedResponse::invalid("Invalid JSON at line 1, column 1");
        let json = to_json(&response, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"is_valid\":false"));
    }
}
