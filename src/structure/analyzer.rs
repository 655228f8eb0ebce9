//! Structure analysis orchestration.
//!
//! Detection, confidence filtering, hierarchy construction, anchoring and
//! statistics run in that order for each document. `analyze` never fails:
//! invalid input and internal faults come back as degraded results with
//! `metadata.error` set and a warning attached.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use md5::{Digest, Md5};
use rayon::prelude::*;
use serde_json::json;

use super::anchor::AnchorAllocator;
use super::detector::{Detection, SectionDetector};
use super::hierarchy::HierarchyBuilder;
use super::options::AnalyzerOptions;
use crate::error::{Error, Result};
use crate::model::{
    AnalysisStatistics, DocumentSection, ExtractedDocument, StructureAnalysisResult,
};

/// Fraction of the time budget after which a "near budget" warning is added.
const NEAR_BUDGET_RATIO: f64 = 0.8;

/// Turns extracted documents into anchored section trees.
#[derive(Debug, Clone)]
pub struct StructureAnalyzer {
    options: AnalyzerOptions,
    detector: SectionDetector,
}

impl StructureAnalyzer {
    /// Create an analyzer with the given options.
    pub fn new(options: AnalyzerOptions) -> Self {
        let detector = SectionDetector::new(&options);
        Self { options, detector }
    }

    /// Replace the section detector (e.g. one with extra rules).
    pub fn with_detector(mut self, detector: SectionDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Options in use.
    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyze one document.
    pub fn analyze(&self, doc: &ExtractedDocument) -> StructureAnalysisResult {
        let started = Instant::now();
        let document_id = document_id(doc);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(doc, &document_id, started)
        }))
        .unwrap_or_else(|payload| Err(Error::from_panic(payload)));

        match outcome {
            Ok(result) => result,
            Err(err) => {
                log::warn!("Structure analysis of '{}' failed: {}", doc.original_path, err);
                let mut result = StructureAnalysisResult::empty(document_id);
                result.statistics.element_count = doc.element_count();
                result
                    .metadata
                    .insert("error".to_string(), json!(err.to_string()));
                result.warnings.push(err.to_string());
                result.analysis_time = started.elapsed().as_secs_f64();
                result
            }
        }
    }

    /// Analyze several documents, each isolated from the others' failures.
    pub fn analyze_batch(&self, docs: &[ExtractedDocument]) -> Vec<StructureAnalysisResult> {
        if self.options.parallel {
            docs.par_iter().map(|doc| self.analyze(doc)).collect()
        } else {
            docs.iter().map(|doc| self.analyze(doc)).collect()
        }
    }

    fn run(
        &self,
        doc: &ExtractedDocument,
        document_id: &str,
        started: Instant,
    ) -> Result<StructureAnalysisResult> {
        self.validate(doc)?;

        // One allocator per run keeps anchors from leaking across documents.
        let mut allocator = AnchorAllocator::new(self.options.anchor.clone());
        allocator.reset();

        let detection = self.detector.detect(doc, started);
        let Detection {
            sections,
            processed_elements,
            headers_detected,
            fallback_used,
            budget_exceeded,
            paragraphs,
            lists,
            tables,
            texts,
        } = detection;

        let (kept, filtered) =
            filter_by_confidence(sections, self.options.min_confidence_threshold);
        if filtered > 0 {
            log::debug!(
                "Dropped {} sections below confidence {}",
                filtered,
                self.options.min_confidence_threshold
            );
        }

        let mut tree = HierarchyBuilder::new().build(kept);
        for section in &mut tree {
            assign_anchors(section, &mut allocator);
        }

        let mut result = StructureAnalysisResult::empty(document_id);
        result.statistics = AnalysisStatistics {
            element_count: doc.element_count(),
            processed_elements,
            headers_detected,
            filtered_sections: filtered,
            paragraph_count: paragraphs,
            list_count: lists,
            table_count: tables,
            text_count: texts,
            fallback_used,
            budget_exceeded,
            ..AnalysisStatistics::default()
        };
        result.statistics.record_tree(&tree);
        result.sections = tree;
        result.average_confidence = average_confidence(&result.sections);

        if fallback_used {
            result
                .warnings
                .push("No headers detected, fallback section used".to_string());
        }

        let budget = self.options.max_analysis_time.as_secs_f64();
        let elapsed = started.elapsed().as_secs_f64();
        if budget_exceeded {
            result.warnings.push(format!(
                "Analysis time budget of {:.1}s exceeded after {} of {} elements, partial structure returned",
                budget,
                processed_elements,
                doc.element_count()
            ));
        } else if elapsed > budget * NEAR_BUDGET_RATIO {
            result.warnings.push(format!(
                "Analysis time near budget ({:.2}s of {:.1}s)",
                elapsed, budget
            ));
        }

        result
            .metadata
            .insert("document_path".to_string(), json!(doc.original_path));
        result
            .metadata
            .insert("mime_type".to_string(), json!(doc.mime_type));
        result
            .metadata
            .insert("total_pages".to_string(), json!(doc.total_pages));
        result.metadata.insert(
            "analyzed_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
        result.analysis_time = started.elapsed().as_secs_f64();

        log::debug!(
            "Analyzed '{}': {} sections, average confidence {:.2}",
            doc.original_path,
            result.statistics.total_sections,
            result.average_confidence
        );
        Ok(result)
    }

    fn validate(&self, doc: &ExtractedDocument) -> Result<()> {
        if doc.is_empty() {
            return Err(Error::Validation("Document has no elements".to_string()));
        }
        if doc.element_count() > self.options.max_elements {
            return Err(Error::Validation(format!(
                "Document has {} elements, exceeding the limit of {}",
                doc.element_count(),
                self.options.max_elements
            )));
        }
        Ok(())
    }
}

impl Default for StructureAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerOptions::default())
    }
}

/// Drop sections below `threshold`, returning the survivors and the number
/// dropped.
///
/// When every section falls below the threshold the highest-confidence one
/// is kept. Content of dropped sections is merged into the preceding kept
/// section, or the first kept one when none precedes.
pub fn filter_by_confidence(
    sections: Vec<DocumentSection>,
    threshold: f32,
) -> (Vec<DocumentSection>, usize) {
    if sections.is_empty() {
        return (sections, 0);
    }

    let any_passes = sections.iter().any(|s| s.confidence >= threshold);
    let best = sections
        .iter()
        .enumerate()
        .fold(0, |best, (i, s)| {
            if s.confidence > sections[best].confidence {
                i
            } else {
                best
            }
        });

    let mut kept: Vec<DocumentSection> = Vec::new();
    let mut orphaned: Vec<DocumentSection> = Vec::new();
    let mut dropped = 0;

    for (i, section) in sections.into_iter().enumerate() {
        let keep = if any_passes {
            section.confidence >= threshold
        } else {
            i == best
        };

        if keep {
            let mut section = section;
            if !orphaned.is_empty() {
                prepend_orphans(&mut section, std::mem::take(&mut orphaned));
            }
            kept.push(section);
        } else {
            dropped += 1;
            match kept.last_mut() {
                Some(previous) => append_content(previous, section),
                None => orphaned.push(section),
            }
        }
    }

    (kept, dropped)
}

/// Text a dropped section contributes to its neighbour. Synthetic titles
/// never appeared in the document, so only their content is carried.
fn dropped_text(section: &DocumentSection) -> String {
    let title = if is_synthetic(section) {
        ""
    } else {
        section.title.trim()
    };
    [title, section.content.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_synthetic(section: &DocumentSection) -> bool {
    matches!(
        section.metadata.get("rule").and_then(|rule| rule.as_str()),
        Some("preamble" | "fallback")
    )
}

fn append_content(target: &mut DocumentSection, dropped: DocumentSection) {
    let text = dropped_text(&dropped);
    if !text.is_empty() {
        if !target.content.is_empty() {
            target.content.push_str("\n\n");
        }
        target.content.push_str(&text);
    }
    target.elements.extend(dropped.elements);
    target.end_position = target.end_position.max(dropped.end_position);
}

fn prepend_orphans(target: &mut DocumentSection, orphans: Vec<DocumentSection>) {
    let mut parts: Vec<String> = orphans
        .iter()
        .map(dropped_text)
        .filter(|text| !text.is_empty())
        .collect();
    if !target.content.is_empty() {
        parts.push(std::mem::take(&mut target.content));
    }
    target.content = parts.join("\n\n");

    let mut elements = Vec::new();
    for orphan in orphans {
        target.start_position = target.start_position.min(orphan.start_position);
        elements.extend(orphan.elements);
    }
    elements.append(&mut target.elements);
    target.elements = elements;
}

fn assign_anchors(section: &mut DocumentSection, allocator: &mut AnchorAllocator) {
    let anchor_id = allocator.generate_id(&section.id, &section.title);
    section.anchor = allocator.wrap(&anchor_id);
    section.anchor_id = anchor_id;
    for sub in &mut section.subsections {
        assign_anchors(sub, allocator);
    }
}

fn average_confidence(sections: &[DocumentSection]) -> f32 {
    let mut total = 0.0f32;
    let mut count = 0usize;
    for section in sections {
        section.walk(&mut |s| {
            total += s.confidence;
            count += 1;
        });
    }
    if count == 0 {
        0.0
    } else {
        (total / count as f32).clamp(0.0, 1.0)
    }
}

/// Stable id for a document: `doc_` plus the first 12 hex digits of the
/// MD5 of its full text.
pub fn document_id(doc: &ExtractedDocument) -> String {
    let digest = Md5::digest(doc.full_text().as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("doc_{}", &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentElement;
    use std::time::Duration;

    fn section(id: &str, confidence: f32) -> DocumentSection {
        let mut s = DocumentSection::new(id, id.to_uppercase(), 1).with_confidence(confidence);
        s.content = format!("{} body", id);
        s
    }

    fn contract() -> ExtractedDocument {
        ExtractedDocument::from_plain_text(
            "contract.txt",
            "1. PREDMET\nThe subject of this agreement.\n\n2. OPLATA\nPayment terms apply.",
        )
    }

    #[test]
    fn test_filter_keeps_confident_sections() {
        let sections = vec![section("a", 0.9), section("b", 0.3), section("c", 0.95)];
        let (kept, dropped) = filter_by_confidence(sections, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
        assert!(kept[0].content.contains("B\nb body"));
    }

    #[test]
    fn test_filter_keeps_best_when_all_below() {
        let sections = vec![section("a", 0.9), section("b", 0.3), section("c", 0.95)];
        let (kept, dropped) = filter_by_confidence(sections, 0.99);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "c");
        assert_eq!(dropped, 2);
        assert_eq!(kept[0].content, "A\na body\n\nB\nb body\n\nc body");
    }

    #[test]
    fn test_filter_empty() {
        let (kept, dropped) = filter_by_confidence(Vec::new(), 0.5);
        assert!(kept.is_empty());
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_analyze_contract() {
        let result = StructureAnalyzer::default().analyze(&contract());
        let titles: Vec<_> = result.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["1. PREDMET", "2. OPLATA"]);
        assert_eq!(result.sections[0].anchor_id, "section_1_1_predmet");
        assert_eq!(
            result.sections[0].anchor,
            "<!-- SECTION_ANCHOR_section_1_1_predmet -->"
        );
        assert!((0.0..=1.0).contains(&result.average_confidence));
        assert!(result.error().is_none());
        assert!(result.document_id.starts_with("doc_"));
        assert_eq!(result.document_id.len(), 16);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let analyzer = StructureAnalyzer::default();
        let doc = contract();
        let first = analyzer.analyze(&doc);
        let second = analyzer.analyze(&doc);
        assert_eq!(first.anchor_ids(), second.anchor_ids());
        assert_eq!(first.document_id, second.document_id);
    }

    #[test]
    fn test_empty_document_is_degraded() {
        let result = StructureAnalyzer::default().analyze(&ExtractedDocument::new("x", "text/plain"));
        assert!(result.sections.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.error().unwrap_or_default().contains("no elements"));
    }

    #[test]
    fn test_element_ceiling() {
        let options = AnalyzerOptions::new().with_max_elements(1);
        let result = StructureAnalyzer::new(options).analyze(&contract());
        assert!(result.sections.is_empty());
        assert!(result.error().is_some());
    }

    #[test]
    fn test_fallback_warning() {
        let doc = ExtractedDocument::from_plain_text("a.txt", "plain words only");
        let result = StructureAnalyzer::default().analyze(&doc);
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].id, "main");
        assert!(result.statistics.fallback_used);
        assert!(result.warnings.iter().any(|w| w.contains("fallback")));
    }

    #[test]
    fn test_budget_exceeded_returns_partial() {
        let mut doc = ExtractedDocument::new("a.txt", "text/plain");
        for i in 0..20 {
            doc.add_element(DocumentElement::header(format!("Part {}", i), 1));
        }
        let options = AnalyzerOptions::new()
            .with_max_analysis_time(Duration::ZERO)
            .with_time_check_interval(5);
        let result = StructureAnalyzer::new(options).analyze(&doc);
        assert_eq!(result.sections.len(), 5);
        assert!(result.statistics.budget_exceeded);
        assert!(result.warnings.iter().any(|w| w.contains("budget")));
    }

    #[test]
    fn test_duplicate_titles_get_unique_anchors() {
        let mut doc = ExtractedDocument::new("a.pdf", "application/pdf");
        for _ in 0..3 {
            doc.add_element(DocumentElement::header("Terms", 1));
            doc.add_element(DocumentElement::paragraph("text"));
        }
        let result = StructureAnalyzer::default().analyze(&doc);
        let mut ids = result.anchor_ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let docs = vec![
            contract(),
            ExtractedDocument::new("empty", "text/plain"),
            contract(),
        ];
        let results = StructureAnalyzer::default().analyze_batch(&docs);
        assert_eq!(results.len(), 3);
        assert!(results[0].error().is_none());
        assert!(results[1].error().is_some());
        assert_eq!(results[0].anchor_ids(), results[2].anchor_ids());
    }

    #[test]
    fn test_preamble_merges_without_synthetic_title() {
        let text = "Dated today\n\n# Terms\n\nbody text here";
        let doc = ExtractedDocument::from_plain_text("memo.txt", text);
        let result = StructureAnalyzer::default().analyze(&doc);
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].title, "Terms");
        assert_eq!(result.sections[0].content, "Dated today\n\nbody text here");
    }

    #[test]
    fn test_dropped_real_section_keeps_title() {
        let mut low = section("notes", 0.2);
        low.metadata.insert("rule".to_string(), serde_json::json!("markdown_header"));
        let (kept, dropped) = filter_by_confidence(vec![section("intro", 0.9), low], 0.5);
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].content, "intro body\n\nNOTES\nnotes body");
    }
}
