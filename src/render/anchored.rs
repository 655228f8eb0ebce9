//! Anchored plain text and outlines of a section tree.

use crate::model::{DocumentSection, StructureAnalysisResult};

/// Render the section tree as anchored text, depth first.
///
/// Each section becomes a `marker\ntitle\ncontent` block and blocks are
/// separated by a blank line. This is the text handed to a model; anchors
/// in its reply can later be swapped with
/// [`AnchorAllocator::replace_anchor`](crate::structure::AnchorAllocator::replace_anchor).
pub fn anchored_text(result: &StructureAnalysisResult) -> String {
    let mut blocks = Vec::new();
    for section in result.flatten() {
        blocks.push(section_block(section));
    }
    blocks.join("\n\n")
}

fn section_block(section: &DocumentSection) -> String {
    let mut block = String::new();
    if !section.anchor.is_empty() {
        block.push_str(&section.anchor);
        block.push('\n');
    }
    block.push_str(&section.title);
    let content = section.content.trim();
    if !content.is_empty() {
        block.push('\n');
        block.push_str(content);
    }
    block
}

/// One line per section, indented by level:
/// `- title [anchor_id] (confidence)`.
pub fn outline(result: &StructureAnalysisResult) -> String {
    let mut out = String::new();
    for section in result.flatten() {
        let indent = "  ".repeat(usize::from(section.level.saturating_sub(1)));
        out.push_str(&format!(
            "{}- {} [{}] ({:.2})\n",
            indent, section.title, section.anchor_id, section.confidence
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructureAnalysisResult {
        let mut parent = DocumentSection::new("section_1", "1. PREDMET", 1).with_confidence(0.8);
        parent.anchor_id = "section_1_1_predmet".to_string();
        parent.anchor = "<!-- SECTION_ANCHOR_section_1_1_predmet -->".to_string();
        parent.content = "Subject of the contract.".to_string();

        let mut child = DocumentSection::new("section_2", "1.1 Scope", 2).with_confidence(0.7);
        child.anchor_id = "section_2_1_1_scope".to_string();
        child.anchor = "<!-- SECTION_ANCHOR_section_2_1_1_scope -->".to_string();
        parent.add_subsection(child);

        let mut result = StructureAnalysisResult::empty("doc_1");
        result.sections.push(parent);
        result
    }

    #[test]
    fn test_anchored_text() {
        let text = anchored_text(&sample());
        assert_eq!(
            text,
            "<!-- SECTION_ANCHOR_section_1_1_predmet -->\n1. PREDMET\nSubject of the contract.\n\n\
             <!-- SECTION_ANCHOR_section_2_1_1_scope -->\n1.1 Scope"
        );
    }

    #[test]
    fn test_outline() {
        let outline = outline(&sample());
        let lines: Vec<_> = outline.lines().collect();
        assert_eq!(lines[0], "- 1. PREDMET [section_1_1_predmet] (0.80)");
        assert_eq!(lines[1], "  - 1.1 Scope [section_2_1_1_scope] (0.70)");
    }

    #[test]
    fn test_empty_result() {
        let result = StructureAnalysisResult::empty("doc_1");
        assert_eq!(anchored_text(&result), "");
        assert_eq!(outline(&result), "");
    }
}
