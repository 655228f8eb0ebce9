//! Document model types for structure analysis.
//!
//! `ExtractedDocument` is what format extractors hand over; the section
//! tree and `StructureAnalysisResult` are what analysis produces.

mod document;
mod section;

pub use document::{
    DocumentElement, ElementKind, ExtractedDocument, ListType, StyleHint, ELEMENT_SEPARATOR,
};
pub use section::{AnalysisStatistics, DocumentSection, StructureAnalysisResult};
