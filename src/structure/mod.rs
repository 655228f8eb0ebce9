//! Document structure analysis.
//!
//! Turns a flat [`ExtractedDocument`](crate::model::ExtractedDocument) into a
//! tree of titled sections, each carrying a unique anchor marker.

pub mod analyzer;
pub mod anchor;
pub mod detector;
pub mod fonts;
pub mod hierarchy;
pub mod options;
pub mod patterns;

pub use analyzer::{document_id, filter_by_confidence, StructureAnalyzer};
pub use anchor::{AnchorAllocator, AnchorOptions, DEFAULT_ANCHOR_PREFIX, DEFAULT_ANCHOR_SUFFIX};
pub use detector::{Detection, SectionDetector, FALLBACK_CONFIDENCE, PREAMBLE_CONFIDENCE};
pub use fonts::FontProfile;
pub use hierarchy::HierarchyBuilder;
pub use options::AnalyzerOptions;
pub use patterns::{
    Classification, LevelRule, PatternClassifier, PatternRule, RuleCategory, UnitKind,
};
