//! Extracted document types (input to structure analysis).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Separator placed between element texts in [`ExtractedDocument::full_text`].
pub const ELEMENT_SEPARATOR: &str = "\n\n";

/// A document as delivered by a format extractor (PDF, DOCX, TXT readers).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Path of the source file
    pub original_path: String,

    /// MIME type of the source file
    pub mime_type: String,

    /// Ordered content elements
    pub elements: Vec<DocumentElement>,

    /// Extractor-specific metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Total number of pages (0 when unknown)
    #[serde(default)]
    pub total_pages: u32,
}

impl ExtractedDocument {
    /// Create a new empty document.
    pub fn new(original_path: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            original_path: original_path.into(),
            mime_type: mime_type.into(),
            ..Default::default()
        }
    }

    /// Build a document from plain text, one `Text` element per
    /// blank-line separated block.
    pub fn from_plain_text(original_path: impl Into<String>, text: &str) -> Self {
        let mut doc = Self::new(original_path, "text/plain");
        let normalized = text.replace("\r\n", "\n");
        let mut block = Vec::new();

        for line in normalized.lines() {
            if line.trim().is_empty() {
                if !block.is_empty() {
                    doc.add_element(DocumentElement::raw(block.join("\n")));
                    block.clear();
                }
            } else {
                block.push(line);
            }
        }
        if !block.is_empty() {
            doc.add_element(DocumentElement::raw(block.join("\n")));
        }

        doc.total_pages = 1;
        doc
    }

    /// Deserialize a document from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Add an element to the document.
    pub fn add_element(&mut self, element: DocumentElement) {
        self.elements.push(element);
    }

    /// Get the number of elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Full text of the document: element texts joined by a blank line.
    ///
    /// Section positions are byte offsets into this string.
    pub fn full_text(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.text())
            .collect::<Vec<_>>()
            .join(ELEMENT_SEPARATOR)
    }
}

/// A single content element with its extractor confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentElement {
    /// Element content
    #[serde(flatten)]
    pub kind: ElementKind,

    /// Extractor confidence in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    /// Font information, when the extractor has it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleHint>,
}

fn default_confidence() -> f32 {
    1.0
}

impl DocumentElement {
    /// Create an element with full confidence and no style information.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            confidence: 1.0,
            style: None,
        }
    }

    /// Create a header element.
    pub fn header(content: impl Into<String>, level: u8) -> Self {
        Self::new(ElementKind::Header {
            content: content.into(),
            level: level.clamp(1, 6),
        })
    }

    /// Create a paragraph element.
    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::new(ElementKind::Paragraph {
            content: content.into(),
        })
    }

    /// Create a list element.
    pub fn list(items: Vec<String>, list_type: ListType) -> Self {
        Self::new(ElementKind::List { items, list_type })
    }

    /// Create a raw text element.
    pub fn raw(content: impl Into<String>) -> Self {
        Self::new(ElementKind::Text {
            content: content.into(),
        })
    }

    /// Set the extractor confidence (clamped to [0, 1]).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Attach font information.
    pub fn with_style(mut self, style: StyleHint) -> Self {
        self.style = Some(style);
        self
    }

    /// Plain text of the element; list items are joined by newlines.
    pub fn text(&self) -> String {
        match &self.kind {
            ElementKind::Header { content, .. }
            | ElementKind::Paragraph { content }
            | ElementKind::Text { content } => content.clone(),
            ElementKind::List { items, .. } => items.join("\n"),
        }
    }

    /// Check if this is a header element.
    pub fn is_header(&self) -> bool {
        matches!(self.kind, ElementKind::Header { .. })
    }
}

/// Element variants produced by extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    /// A heading with its level (1 = top)
    Header {
        /// Heading text
        content: String,
        /// Heading level (1-6)
        level: u8,
    },

    /// A paragraph of running text
    Paragraph {
        /// Paragraph text
        content: String,
    },

    /// A list of items
    List {
        /// Item texts without markers
        items: Vec<String>,
        /// Marker style
        list_type: ListType,
    },

    /// Unclassified text
    Text {
        /// Raw text
        content: String,
    },
}

/// List marker style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// •, -, * markers
    #[default]
    Bullet,
    /// 1. 2. 3.
    Numbered,
    /// a) b) c)
    Lettered,
    /// i. ii. iii.
    Roman,
}

/// Font information attached to an element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleHint {
    /// Font size in points
    pub font_size: Option<f32>,

    /// Bold weight
    #[serde(default)]
    pub bold: bool,
}

impl StyleHint {
    /// Style with a font size.
    pub fn sized(font_size: f32) -> Self {
        Self {
            font_size: Some(font_size),
            bold: false,
        }
    }

    /// Bold style without size information.
    pub fn bold() -> Self {
        Self {
            font_size: None,
            bold: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_new() {
        let doc = ExtractedDocument::new("contract.pdf", "application/pdf");
        assert!(doc.is_empty());
        assert_eq!(doc.element_count(), 0);
        assert_eq!(doc.full_text(), "");
    }

    #[test]
    fn test_from_plain_text_blocks() {
        let doc = ExtractedDocument::from_plain_text("a.txt", "One\ntwo\n\n\nThree\r\n");
        assert_eq!(doc.element_count(), 2);
        assert_eq!(doc.elements[0].text(), "One\ntwo");
        assert_eq!(doc.full_text(), "One\ntwo\n\nThree");
    }

    #[test]
    fn test_list_text_joins_items() {
        let el = DocumentElement::list(vec!["a".into(), "b".into()], ListType::Numbered);
        assert_eq!(el.text(), "a\nb");
        assert!(!el.is_header());
    }

    #[test]
    fn test_confidence_clamped() {
        let el = DocumentElement::paragraph("x").with_confidence(1.7);
        assert_eq!(el.confidence, 1.0);
    }

    #[test]
    fn test_element_json_shape() {
        let json = r#"{"type":"header","content":"Intro","level":2}"#;
        let el: DocumentElement = serde_json::from_str(json).unwrap();
        assert!(el.is_header());
        assert_eq!(el.confidence, 1.0);
        assert!(el.style.is_none());
    }

    #[test]
    fn test_raw_element_text() {
        let el = DocumentElement::raw("Line one\nLine two");
        assert!(matches!(el.kind, ElementKind::Text { .. }));
        assert_eq!(el.text(), "Line one\nLine two");
    }
}
