//! Section tree and analysis result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DocumentElement;

/// A contiguous titled span of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Section id (`section_{n}` in document order, or `main`)
    pub id: String,

    /// Section title
    pub title: String,

    /// Body text (without the title line)
    pub content: String,

    /// Nesting level (0 = synthetic root, 1 = top-level heading)
    pub level: u8,

    /// Byte offset of the section start in the document full text
    pub start_position: usize,

    /// Byte offset one past the section end
    pub end_position: usize,

    /// Unique anchor id (without prefix/suffix)
    pub anchor_id: String,

    /// Anchor marker as embedded in text
    pub anchor: String,

    /// Body elements
    pub elements: Vec<DocumentElement>,

    /// Nested sections
    pub subsections: Vec<DocumentSection>,

    /// Confidence that this section boundary is real, in [0, 1]
    pub confidence: f32,

    /// Detection details (rule name, element counts, ...)
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DocumentSection {
    /// Create a section without anchor, content or children.
    pub fn new(id: impl Into<String>, title: impl Into<String>, level: u8) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            level,
            start_position: 0,
            end_position: 0,
            anchor_id: String::new(),
            anchor: String::new(),
            elements: Vec::new(),
            subsections: Vec::new(),
            confidence: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the confidence (clamped to [0, 1]).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the position span.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start_position = start;
        self.end_position = end.max(start);
        self
    }

    /// Add a nested section.
    pub fn add_subsection(&mut self, section: DocumentSection) {
        self.subsections.push(section);
    }

    /// Check if the section has nested sections.
    pub fn has_subsections(&self) -> bool {
        !self.subsections.is_empty()
    }

    /// Number of sections in this subtree, including this one.
    pub fn total_count(&self) -> usize {
        1 + self
            .subsections
            .iter()
            .map(|s| s.total_count())
            .sum::<usize>()
    }

    /// Depth of this subtree (1 for a leaf).
    pub fn depth(&self) -> usize {
        1 + self
            .subsections
            .iter()
            .map(|s| s.depth())
            .max()
            .unwrap_or(0)
    }

    /// Visit this section and all descendants depth first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a DocumentSection)) {
        f(self);
        for sub in &self.subsections {
            sub.walk(f);
        }
    }
}

/// Outcome of one structure analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureAnalysisResult {
    /// Stable document id derived from the document text
    pub document_id: String,

    /// Root-level sections
    pub sections: Vec<DocumentSection>,

    /// Wall-clock analysis time in seconds
    pub analysis_time: f64,

    /// Mean confidence over all sections (0 when there are none)
    pub average_confidence: f32,

    /// Aggregate statistics
    pub statistics: AnalysisStatistics,

    /// Run metadata (`error` is set on degraded results)
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Non-fatal problems encountered
    pub warnings: Vec<String>,
}

impl StructureAnalysisResult {
    /// Create an empty result for a document id.
    pub fn empty(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            sections: Vec::new(),
            analysis_time: 0.0,
            average_confidence: 0.0,
            statistics: AnalysisStatistics::default(),
            metadata: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if no sections were produced.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Error message of a degraded result.
    pub fn error(&self) -> Option<&str> {
        self.metadata.get("error").and_then(|v| v.as_str())
    }

    /// Total number of sections, including nested ones.
    pub fn total_sections(&self) -> usize {
        self.sections.iter().map(|s| s.total_count()).sum()
    }

    /// All sections in depth-first order.
    pub fn flatten(&self) -> Vec<&DocumentSection> {
        let mut out = Vec::new();
        for section in &self.sections {
            section.walk(&mut |s| out.push(s));
        }
        out
    }

    /// Find a section by id anywhere in the tree.
    pub fn find_section(&self, id: &str) -> Option<&DocumentSection> {
        self.flatten().into_iter().find(|s| s.id == id)
    }

    /// All anchor ids in depth-first order.
    pub fn anchor_ids(&self) -> Vec<String> {
        self.flatten()
            .into_iter()
            .map(|s| s.anchor_id.clone())
            .collect()
    }
}

/// Statistics collected during structure analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    /// Number of input elements
    pub element_count: usize,

    /// Number of elements actually scanned (less on budget stop)
    pub processed_elements: usize,

    /// Sections in the final tree, including nested ones
    pub total_sections: usize,

    /// Root-level sections
    pub root_sections: usize,

    /// Deepest nesting in the tree
    pub max_depth: usize,

    /// Header units detected before filtering
    pub headers_detected: usize,

    /// Sections removed by confidence filtering
    pub filtered_sections: usize,

    /// Sum of section content lengths in bytes
    pub total_content_length: usize,

    /// Paragraph units seen
    pub paragraph_count: usize,

    /// List units seen
    pub list_count: usize,

    /// Table units seen
    pub table_count: usize,

    /// Unclassified text units seen
    pub text_count: usize,

    /// Whether the single-section fallback was used
    pub fallback_used: bool,

    /// Whether the time budget stopped the scan
    pub budget_exceeded: bool,
}

impl AnalysisStatistics {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the tree-derived fields from final sections.
    pub fn record_tree(&mut self, sections: &[DocumentSection]) {
        self.root_sections = sections.len();
        self.total_sections = sections.iter().map(|s| s.total_count()).sum();
        self.max_depth = sections.iter().map(|s| s.depth()).max().unwrap_or(0);
        let mut length = 0;
        for section in sections {
            section.walk(&mut |s| length += s.content.len());
        }
        self.total_content_length = length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> DocumentSection {
        let mut root = DocumentSection::new("section_1", "Chapter 1", 1);
        let mut child = DocumentSection::new("section_2", "1.1", 2);
        child.add_subsection(DocumentSection::new("section_3", "1.1.1", 3));
        root.add_subsection(child);
        root.add_subsection(DocumentSection::new("section_4", "1.2", 2));
        root
    }

    #[test]
    fn test_total_count_and_depth() {
        let root = tree();
        assert_eq!(root.total_count(), 4);
        assert_eq!(root.depth(), 3);
        assert!(root.has_subsections());
    }

    #[test]
    fn test_flatten_is_depth_first() {
        let mut result = StructureAnalysisResult::empty("doc");
        result.sections.push(tree());
        let ids: Vec<_> = result.flatten().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec!["section_1", "section_2", "section_3", "section_4"]);
        assert_eq!(result.total_sections(), 4);
        assert!(result.find_section("section_3").is_some());
    }

    #[test]
    fn test_confidence_clamped() {
        let s = DocumentSection::new("a", "A", 1).with_confidence(-0.2);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn test_record_tree() {
        let mut root = tree();
        root.content = "abc".to_string();
        let mut stats = AnalysisStatistics::new();
        stats.record_tree(&[root]);
        assert_eq!(stats.total_sections, 4);
        assert_eq!(stats.root_sections, 1);
        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.total_content_length, 3);
    }
}
