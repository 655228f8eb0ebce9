//! # docanchor
//!
//! Document structure analysis and model-response parsing for Rust.
//!
//! This library splits extracted documents into titled sections with
//! unique anchor markers, and turns the JSON replies of generative models
//! back into validated, structured data that references those anchors.
//!
//! ## Quick Start
//!
//! ```
//! use docanchor::{analyze_text, parse_response, render};
//!
//! let result = analyze_text("1. PREDMET\nSubject of the contract.\n\n2. OPLATA\nPayment terms.");
//! assert_eq!(result.sections.len(), 2);
//!
//! // Text with anchors, ready for a prompt
//! let anchored = render::anchored_text(&result);
//! assert!(anchored.contains("SECTION_ANCHOR_"));
//!
//! // Parse the model's reply
//! let parsed = parse_response("```json\n{\"summary\": \"Two sections\"}\n```");
//! assert!(parsed.is_successful());
//! ```
//!
//! ## Features
//!
//! - **Section detection**: ordered pattern rules plus font statistics
//! - **Hierarchy**: nesting by heading level
//! - **Anchors**: unique, transliterated, byte-exact markers
//! - **Response parsing**: fence stripping, JSON repair, normalization
//! - **Schema validation**: embedded and on-disk schemas
//! - **Parallel batches**: Uses Rayon for multi-document analysis

pub mod error;
pub mod model;
pub mod render;
pub mod response;
pub mod schema;
pub mod structure;

// Re-export commonly used types
pub use error::{Error, Result};
pub use model::{
    AnalysisStatistics, DocumentElement, DocumentSection, ElementKind, ExtractedDocument,
    ListType, StructureAnalysisResult, StyleHint,
};
pub use render::JsonFormat;
pub use response::{
    LlmParsingRequest, ParseOutcome, ParsedResponse, ParserOptions, ResponseParser, SchemaType,
    ValidationRule,
};
pub use schema::{SchemaDef, SchemaStore, ValidationReport};
pub use structure::{AnalyzerOptions, AnchorAllocator, AnchorOptions, StructureAnalyzer};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Analyze a document with default options.
pub fn analyze_document(doc: &ExtractedDocument) -> StructureAnalysisResult {
    StructureAnalyzer::default().analyze(doc)
}

/// Analyze plain text with default options.
///
/// Blank lines separate elements.
pub fn analyze_text(text: &str) -> StructureAnalysisResult {
    analyze_document(&ExtractedDocument::from_plain_text("", text))
}

/// Load a document from disk.
///
/// `.json` files are read as a serialized [`ExtractedDocument`]; anything
/// else is read as plain text.
///
/// # Example
///
/// ```no_run
/// use docanchor::{analyze_document, load_document};
///
/// let doc = load_document("contract.txt")?;
/// let result = analyze_document(&doc);
/// println!("Sections: {}", result.total_sections());
/// # Ok::<(), docanchor::Error>(())
/// ```
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<ExtractedDocument> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let mut doc = ExtractedDocument::from_json(&content)?;
        if doc.original_path.is_empty() {
            doc.original_path = path.display().to_string();
        }
        Ok(doc)
    } else {
        Ok(ExtractedDocument::from_plain_text(
            path.display().to_string(),
            &content,
        ))
    }
}

/// Parse a raw model response with default options and no schema.
pub fn parse_response(raw: &str) -> ParsedResponse {
    ResponseParser::default().parse(&LlmParsingRequest::new(raw))
}

/// Builder wiring analysis and parsing with shared settings.
///
/// # Example
///
/// ```
/// use docanchor::DocAnchor;
///
/// let docanchor = DocAnchor::new().with_min_confidence(0.6).sequential();
/// let result = docanchor.analyzer().analyze(&docanchor::ExtractedDocument::from_plain_text(
///     "memo.txt",
///     "# Memo\nShort note.",
/// ));
/// assert_eq!(result.sections[0].title, "Memo");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocAnchor {
    analyzer_options: AnalyzerOptions,
    parser_options: ParserOptions,
    schema_dir: Option<PathBuf>,
}

impl DocAnchor {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the section confidence threshold.
    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.analyzer_options = self.analyzer_options.with_min_confidence(threshold);
        self
    }

    /// Replace the analyzer options.
    pub fn with_analyzer_options(mut self, options: AnalyzerOptions) -> Self {
        self.analyzer_options = options;
        self
    }

    /// Replace the parser options.
    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.parser_options = options;
        self
    }

    /// Load schemas from a directory in addition to the built-ins.
    pub fn with_schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }

    /// Disable parallel batch analysis.
    pub fn sequential(mut self) -> Self {
        self.analyzer_options = self.analyzer_options.sequential();
        self
    }

    /// Build a structure analyzer.
    pub fn analyzer(&self) -> StructureAnalyzer {
        StructureAnalyzer::new(self.analyzer_options.clone())
    }

    /// Build a schema store.
    pub fn schema_store(&self) -> SchemaStore {
        match &self.schema_dir {
            Some(dir) => SchemaStore::with_directory(dir.clone()),
            None => SchemaStore::with_defaults(),
        }
    }

    /// Build a response parser.
    pub fn parser(&self) -> ResponseParser {
        ResponseParser::new(Arc::new(self.schema_store())).with_options(self.parser_options.clone())
    }
}
