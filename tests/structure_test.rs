//! Integration tests for structure analysis and anchors.

use std::collections::HashSet;

use docanchor::render::{anchored_text, outline};
use docanchor::structure::filter_by_confidence;
use docanchor::{
    analyze_text, AnalyzerOptions, AnchorAllocator, AnchorOptions, DocumentElement,
    DocumentSection, ExtractedDocument, StructureAnalyzer,
};

const CONTRACT: &str = "1. PREDMET\nSubject of the contract.\n\n2. OPLATA\nPayment within 30 days.";

#[test]
fn test_contract_scenario() {
    let result = analyze_text(CONTRACT);

    let titles: Vec<_> = result.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["1. PREDMET", "2. OPLATA"]);
    assert!(result.sections.iter().all(|s| s.level == 1));

    let anchors: HashSet<_> = result.anchor_ids().into_iter().collect();
    assert_eq!(anchors.len(), 2);
    assert!((0.0..=1.0).contains(&result.average_confidence));
    assert!(result.sections[1].content.contains("Payment within 30 days."));
}

#[test]
fn test_nested_sections() {
    let text = "1. PREDMET\nIntro text.\n\n1.1 Obim ugovora\nScope details.\n\n2. OPLATA\nPayment.";
    let result = analyze_text(text);

    assert_eq!(result.sections.len(), 2);
    let first = &result.sections[0];
    assert_eq!(first.subsections.len(), 1);
    assert_eq!(first.subsections[0].title, "1.1 Obim ugovora");
    assert_eq!(first.subsections[0].level, 2);
    assert_eq!(result.total_sections(), 3);

    let ids: Vec<_> = result.flatten().iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec!["section_1", "section_2", "section_3"]);
}

#[test]
fn test_positions_are_monotonic() {
    let result = analyze_text(CONTRACT);
    let flat = result.flatten();
    for pair in flat.windows(2) {
        assert!(pair[0].start_position <= pair[1].start_position);
    }
    for section in flat {
        assert!(section.start_position <= section.end_position);
    }
}

#[test]
fn test_cyrillic_titles_are_transliterated() {
    let result = analyze_text("1. ОБЩИЕ ПОЛОЖЕНИЯ\nТекст.\n\n2. ОПЛАТА\nТекст.");
    assert_eq!(result.sections.len(), 2);
    assert_eq!(
        result.sections[0].anchor_id,
        "section_1_1_obshchie_polozheniya"
    );
    assert!(result.sections[0].anchor_id.is_ascii());
}

#[test]
fn test_idempotent_analysis() {
    let analyzer = StructureAnalyzer::default();
    let doc = ExtractedDocument::from_plain_text("contract.txt", CONTRACT);
    let first = analyzer.analyze(&doc);
    let second = analyzer.analyze(&doc);

    assert_eq!(first.anchor_ids(), second.anchor_ids());
    let titles = |r: &docanchor::StructureAnalysisResult| {
        r.flatten().iter().map(|s| s.title.clone()).collect::<Vec<_>>()
    };
    assert_eq!(titles(&first), titles(&second));
}

#[test]
fn test_anchor_uniqueness_for_identical_titles() {
    let mut allocator = AnchorAllocator::new(AnchorOptions::default());
    let entries: Vec<(String, String)> = (0..10)
        .map(|_| ("section_1".to_string(), "Definitions".to_string()))
        .collect();
    let anchors = allocator.generate_batch(&entries);
    let unique: HashSet<_> = anchors.iter().map(|(_, marker)| marker).collect();
    assert_eq!(unique.len(), 10);
}

#[test]
fn test_anchored_text_round_trip() {
    let result = analyze_text(CONTRACT);
    let mut text = anchored_text(&result);
    let allocator = AnchorAllocator::new(AnchorOptions::default());

    for anchor_id in result.anchor_ids() {
        let replacement = format!("[simplified {}]", anchor_id);
        text = allocator.replace_anchor(&text, &anchor_id, &replacement);
        assert!(text.contains(&replacement));
    }
    assert!(!text.contains("SECTION_ANCHOR_"));
}

#[test]
fn test_generate_then_replace() {
    let mut allocator = AnchorAllocator::new(AnchorOptions::default());
    let marker = allocator.generate("section_4", "Termination");
    let document = format!("Before\n{}\nAfter", marker);

    let replaced = allocator.replace_anchor(&document, "section_4", "Either party may end it.");
    assert!(!replaced.contains(&marker));
    assert!(replaced.contains("Either party may end it."));
}

#[test]
fn test_custom_markers() {
    let options = AnalyzerOptions::new()
        .with_anchor_options(AnchorOptions::new().with_markers("[[", "]]"));
    let result = StructureAnalyzer::new(options)
        .analyze(&ExtractedDocument::from_plain_text("", CONTRACT));
    assert_eq!(result.sections[0].anchor, "[[section_1_1_predmet]]");
}

#[test]
fn test_extracted_header_elements() {
    let mut doc = ExtractedDocument::new("report.pdf", "application/pdf");
    doc.add_element(DocumentElement::header("Overview", 1));
    doc.add_element(DocumentElement::paragraph(
        "This report covers the quarterly results of the company in detail.",
    ));
    doc.add_element(DocumentElement::header("Details", 2));
    doc.add_element(DocumentElement::paragraph("Numbers follow."));

    let result = StructureAnalyzer::default().analyze(&doc);
    assert_eq!(result.sections.len(), 1);
    assert_eq!(result.sections[0].title, "Overview");
    assert_eq!(result.sections[0].subsections[0].title, "Details");
    assert_eq!(result.metadata["mime_type"], "application/pdf");
}

#[test]
fn test_confidence_filtering() {
    let sections = |values: &[f32]| -> Vec<DocumentSection> {
        values
            .iter()
            .enumerate()
            .map(|(i, c)| {
                DocumentSection::new(format!("s{}", i), format!("T{}", i), 1).with_confidence(*c)
            })
            .collect()
    };

    let (kept, dropped) = filter_by_confidence(sections(&[0.9, 0.3, 0.95]), 0.5);
    assert_eq!(kept.len(), 2);
    assert_eq!(dropped, 1);

    let (kept, _) = filter_by_confidence(sections(&[0.9, 0.3, 0.95]), 0.99);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, "s2");
}

#[test]
fn test_batch_matches_single_runs() {
    let docs = vec![
        ExtractedDocument::from_plain_text("a.txt", CONTRACT),
        ExtractedDocument::from_plain_text("b.txt", "# Memo\nShort note."),
    ];
    let analyzer = StructureAnalyzer::default();
    let parallel = analyzer.analyze_batch(&docs);
    let sequential = StructureAnalyzer::new(AnalyzerOptions::new().sequential()).analyze_batch(&docs);

    assert_eq!(parallel.len(), 2);
    for (p, s) in parallel.iter().zip(&sequential) {
        assert_eq!(p.anchor_ids(), s.anchor_ids());
        assert_eq!(p.document_id, s.document_id);
    }
    assert_ne!(parallel[0].document_id, parallel[1].document_id);
}

#[test]
fn test_outline_lists_every_section() {
    let result = analyze_text(CONTRACT);
    assert_eq!(outline(&result).lines().count(), result.total_sections());
}

#[test]
fn test_preamble_text_is_kept_verbatim() {
    let result = analyze_text("Dated today\n\n# Terms\n\nbody text here");
    assert_eq!(result.sections.len(), 1);
    assert_eq!(result.sections[0].content, "Dated today\n\nbody text here");
    assert!(!result.sections[0].content.contains("Preamble"));
}
