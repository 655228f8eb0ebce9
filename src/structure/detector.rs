//! Flat section detection over document elements.

use std::time::{Duration, Instant};

use serde_json::json;

use super::fonts::FontProfile;
use super::options::AnalyzerOptions;
use super::patterns::{Classification, PatternClassifier, UnitKind};
use crate::model::{
    DocumentElement, DocumentSection, ElementKind, ExtractedDocument, ListType, StyleHint,
    ELEMENT_SEPARATOR,
};

/// Confidence of the synthetic whole-document section.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Confidence of the synthetic section holding text before the first header.
pub const PREAMBLE_CONFIDENCE: f32 = 0.4;

/// Pattern strength given to extractor-supplied headers.
const EXTRACTED_HEADER_STRENGTH: f32 = 0.9;

/// Outcome of a detection pass.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Flat sections in document order
    pub sections: Vec<DocumentSection>,
    /// Elements scanned before stopping
    pub processed_elements: usize,
    /// Header units found
    pub headers_detected: usize,
    /// Whether the single-section fallback was produced
    pub fallback_used: bool,
    /// Whether the time budget stopped the scan
    pub budget_exceeded: bool,
    /// Paragraph units seen
    pub paragraphs: usize,
    /// List units seen
    pub lists: usize,
    /// Table units seen
    pub tables: usize,
    /// Unclassified text units seen
    pub texts: usize,
}

/// Scans elements and emits flat candidate sections.
#[derive(Debug, Clone)]
pub struct SectionDetector {
    classifier: PatternClassifier,
    max_analysis_time: Duration,
    time_check_interval: usize,
}

impl SectionDetector {
    /// Create a detector from analyzer options.
    pub fn new(options: &AnalyzerOptions) -> Self {
        Self {
            classifier: PatternClassifier::new(
                options.min_paragraph_length,
                options.max_header_length,
            ),
            max_analysis_time: options.max_analysis_time,
            time_check_interval: options.time_check_interval.max(1),
        }
    }

    /// Replace the classifier (e.g. one with extra rules).
    pub fn with_classifier(mut self, classifier: PatternClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The classifier in use.
    pub fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    /// Detect flat sections; never empty for a non-empty document.
    pub fn detect_sections(&self, doc: &ExtractedDocument) -> Vec<DocumentSection> {
        self.detect(doc, Instant::now()).sections
    }

    /// Detect flat sections with the time budget measured from `started`.
    pub fn detect(&self, doc: &ExtractedDocument, started: Instant) -> Detection {
        let fonts = FontProfile::from_document(doc);
        let mut scan = Scan::default();
        let mut offset = 0usize;

        for (index, element) in doc.elements.iter().enumerate() {
            if index > 0
                && index % self.time_check_interval == 0
                && started.elapsed() >= self.max_analysis_time
            {
                log::warn!(
                    "Analysis budget of {:?} exceeded after {} of {} elements",
                    self.max_analysis_time,
                    index,
                    doc.elements.len()
                );
                scan.detection.budget_exceeded = true;
                break;
            }
            if index > 0 {
                offset += ELEMENT_SEPARATOR.len();
            }

            let text = element.text();
            match &element.kind {
                ElementKind::Header { content, level } => {
                    scan.flush_block(&self.classifier, &fonts);
                    let classification = self.extracted_header(content, *level, element, &fonts);
                    let start = offset + leading_ws(&text);
                    scan.start_section(classification, start, offset + text.trim_end().len());
                }
                ElementKind::List { items, list_type } => {
                    scan.flush_block(&self.classifier, &fonts);
                    scan.add_list(items, *list_type, element.confidence, offset, &text);
                }
                ElementKind::Paragraph { .. } | ElementKind::Text { .. } => {
                    let single_line = text.trim().lines().count() == 1;
                    let style = if single_line {
                        element.style.as_ref()
                    } else {
                        None
                    };
                    self.scan_lines(&mut scan, &text, offset, style, element.confidence, &fonts);
                    scan.flush_block(&self.classifier, &fonts);
                }
            }

            offset += text.len();
            scan.detection.processed_elements = index + 1;
        }

        scan.flush_block(&self.classifier, &fonts);
        scan.finish(offset)
    }

    fn scan_lines(
        &self,
        scan: &mut Scan,
        text: &str,
        base: usize,
        style: Option<&StyleHint>,
        element_confidence: f32,
        fonts: &FontProfile,
    ) {
        let mut line_offset = 0usize;
        for line in text.split('\n') {
            let start = base + line_offset;
            line_offset += line.len() + 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                scan.flush_block(&self.classifier, fonts);
                continue;
            }

            let span_start = start + leading_ws(line);
            let span_end = span_start + trimmed.len();
            let mut classification = self.classifier.classify(trimmed, style, fonts);
            if classification.is_header() {
                scan.flush_block(&self.classifier, fonts);
                classification.pattern_strength *= element_confidence;
                classification.style_strength *= element_confidence;
                scan.start_section(classification, span_start, span_end);
            } else {
                scan.push_line(trimmed, span_start, span_end);
            }
        }
    }

    fn extracted_header(
        &self,
        content: &str,
        level: u8,
        element: &DocumentElement,
        fonts: &FontProfile,
    ) -> Classification {
        let content = content.trim();
        let pattern_strength = self
            .classifier
            .header_rule(content)
            .map(|r| r.strength)
            .unwrap_or(0.0)
            .max(EXTRACTED_HEADER_STRENGTH);
        let style_strength = fonts
            .style_match(element.style.as_ref())
            .map(|(strength, _)| strength)
            .unwrap_or(0.0);

        Classification {
            kind: UnitKind::Header {
                level: level.clamp(1, 6),
            },
            rule: "extracted_header",
            title: Some(content.to_string()),
            pattern_strength: pattern_strength * element.confidence,
            style_strength: style_strength * element.confidence,
        }
    }
}

impl Default for SectionDetector {
    fn default() -> Self {
        Self::new(&AnalyzerOptions::default())
    }
}

/// A section being filled while scanning.
#[derive(Debug)]
struct PendingSection {
    title: String,
    level: u8,
    confidence: f32,
    rule: &'static str,
    start: usize,
    end: usize,
    body: Vec<String>,
    elements: Vec<DocumentElement>,
}

impl PendingSection {
    fn new(title: String, level: u8, confidence: f32, rule: &'static str, start: usize) -> Self {
        Self {
            title,
            level,
            confidence,
            rule,
            start,
            end: start,
            body: Vec::new(),
            elements: Vec::new(),
        }
    }

    fn add_body(&mut self, text: String, element: DocumentElement, end: usize) {
        self.body.push(text);
        self.elements.push(element);
        self.end = self.end.max(end);
    }

    fn into_section(self, id: String) -> DocumentSection {
        let element_count = self.elements.len();
        let mut section = DocumentSection::new(id, self.title, self.level)
            .with_confidence(self.confidence)
            .with_span(self.start, self.end);
        section.content = self.body.join("\n\n");
        section.elements = self.elements;
        section.metadata.insert("rule".to_string(), json!(self.rule));
        section
            .metadata
            .insert("element_count".to_string(), json!(element_count));
        section
    }
}

/// Mutable scan state.
#[derive(Debug, Default)]
struct Scan {
    detection: Detection,
    preamble: Option<PendingSection>,
    current: Option<PendingSection>,
    finished: Vec<PendingSection>,
    block: Vec<String>,
    block_start: usize,
    block_end: usize,
}

impl Scan {
    fn push_line(&mut self, line: &str, start: usize, end: usize) {
        if self.block.is_empty() {
            self.block_start = start;
        }
        self.block.push(line.to_string());
        self.block_end = end;
    }

    fn flush_block(&mut self, classifier: &PatternClassifier, fonts: &FontProfile) {
        if self.block.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.block).join("\n");
        let classification = classifier.classify(&text, None, fonts);
        let confidence = classification.confidence();

        let element = match classification.kind {
            UnitKind::ListItem(list_type) | UnitKind::MultiLineList(list_type) => {
                self.detection.lists += 1;
                DocumentElement::list(text.lines().map(str::to_string).collect(), list_type)
            }
            UnitKind::Table => {
                self.detection.tables += 1;
                DocumentElement::raw(text.clone())
            }
            UnitKind::Paragraph => {
                self.detection.paragraphs += 1;
                DocumentElement::paragraph(text.clone())
            }
            UnitKind::Text | UnitKind::Header { .. } => {
                self.detection.texts += 1;
                DocumentElement::raw(text.clone())
            }
        }
        .with_confidence(confidence);

        let end = self.block_end;
        let start = self.block_start;
        self.target(start).add_body(text, element, end);
    }

    fn add_list(
        &mut self,
        items: &[String],
        list_type: ListType,
        confidence: f32,
        offset: usize,
        text: &str,
    ) {
        self.detection.lists += 1;
        let element = DocumentElement::list(items.to_vec(), list_type).with_confidence(confidence);
        let start = offset + leading_ws(text);
        let end = offset + text.trim_end().len();
        self.target(start).add_body(text.trim().to_string(), element, end);
    }

    /// Section receiving body content: the current one, or the preamble.
    fn target(&mut self, start: usize) -> &mut PendingSection {
        if let Some(ref mut current) = self.current {
            return current;
        }
        self.preamble.get_or_insert_with(|| {
            PendingSection::new(
                "Preamble".to_string(),
                1,
                PREAMBLE_CONFIDENCE,
                "preamble",
                start,
            )
        })
    }

    fn start_section(&mut self, classification: Classification, start: usize, end: usize) {
        self.detection.headers_detected += 1;
        if let Some(done) = self.current.take() {
            self.finished.push(done);
        }
        let level = match classification.kind {
            UnitKind::Header { level } => level,
            _ => 1,
        };
        let confidence = classification.confidence();
        let title = classification.title.unwrap_or_default();
        log::debug!(
            "Header '{}' (level {}, rule {}, confidence {:.2})",
            title,
            level,
            classification.rule,
            confidence
        );
        let mut pending = PendingSection::new(title, level, confidence, classification.rule, start);
        pending.end = end;
        self.current = Some(pending);
    }

    fn finish(mut self, text_len: usize) -> Detection {
        if let Some(done) = self.current.take() {
            self.finished.push(done);
        }

        let mut detection = self.detection;

        if self.finished.is_empty() {
            // No headers: one synthetic section covering everything scanned.
            let mut main = self
                .preamble
                .take()
                .unwrap_or_else(|| PendingSection::new(String::new(), 0, 0.0, "fallback", 0));
            main.title = "Document".to_string();
            main.level = 0;
            main.confidence = FALLBACK_CONFIDENCE;
            main.rule = "fallback";
            main.start = 0;
            main.end = main.end.max(text_len);
            detection.fallback_used = true;
            detection.sections = vec![main.into_section("main".to_string())];
            return detection;
        }

        detection.sections = self
            .preamble
            .take()
            .into_iter()
            .chain(self.finished)
            .enumerate()
            .map(|(i, pending)| pending.into_section(format!("section_{}", i + 1)))
            .collect();
        detection
    }
}

fn leading_ws(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(doc: &ExtractedDocument) -> Detection {
        SectionDetector::default().detect(doc, Instant::now())
    }

    #[test]
    fn test_plain_text_headers() {
        let doc = ExtractedDocument::from_plain_text(
            "contract.txt",
            "1. PREDMET\nThe subject of the agreement.\n\n2. OPLATA\nPayment is due monthly.",
        );
        let detection = detect(&doc);

        let titles: Vec<_> = detection.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["1. PREDMET", "2. OPLATA"]);
        assert_eq!(detection.sections[0].id, "section_1");
        assert_eq!(detection.sections[0].content, "The subject of the agreement.");
        assert_eq!(detection.headers_detected, 2);
        assert!(!detection.fallback_used);
    }

    #[test]
    fn test_positions_are_monotonic() {
        let doc = ExtractedDocument::from_plain_text(
            "a.txt",
            "# One\nalpha\n\n## Two\nbeta\n\n# Three\ngamma",
        );
        let full = doc.full_text();
        let sections = detect(&doc).sections;
        assert_eq!(sections.len(), 3);

        for pair in sections.windows(2) {
            assert!(pair[0].end_position <= pair[1].start_position);
        }
        let first = &sections[0];
        assert_eq!(&full[first.start_position..first.end_position], "# One\nalpha");
    }

    #[test]
    fn test_no_headers_uses_fallback() {
        let doc = ExtractedDocument::from_plain_text("a.txt", "just some words\n\nmore words");
        let detection = detect(&doc);
        assert!(detection.fallback_used);
        assert_eq!(detection.sections.len(), 1);

        let main = &detection.sections[0];
        assert_eq!(main.id, "main");
        assert_eq!(main.title, "Document");
        assert_eq!(main.level, 0);
        assert_eq!(main.end_position, doc.full_text().len());
        assert_eq!(main.elements.len(), 2);
    }

    #[test]
    fn test_preamble_before_first_header() {
        let doc = ExtractedDocument::from_plain_text("a.txt", "Dated today\n\n# Terms\nbody");
        let sections = detect(&doc).sections;
        assert_eq!(sections[0].id, "section_1");
        assert_eq!(sections[0].title, "Preamble");
        assert_eq!(sections[0].confidence, PREAMBLE_CONFIDENCE);
        assert_eq!(sections[1].title, "Terms");
        assert_eq!(sections[1].id, "section_2");
    }

    #[test]
    fn test_extracted_header_elements() {
        let mut doc = ExtractedDocument::new("a.pdf", "application/pdf");
        doc.add_element(DocumentElement::header("Introduction", 1));
        doc.add_element(DocumentElement::paragraph("Some introductory text."));
        doc.add_element(DocumentElement::header("Background", 2).with_confidence(0.5));
        doc.add_element(DocumentElement::list(
            vec!["first".into(), "second".into()],
            ListType::Bullet,
        ));

        let detection = detect(&doc);
        assert_eq!(detection.sections.len(), 2);
        assert_eq!(detection.sections[1].level, 2);
        assert!(detection.sections[0].confidence > detection.sections[1].confidence);
        assert_eq!(detection.lists, 1);
        assert_eq!(detection.sections[1].elements.len(), 1);
    }

    #[test]
    fn test_style_header_from_font_size() {
        let mut doc = ExtractedDocument::new("a.pdf", "application/pdf");
        doc.add_element(DocumentElement::raw("Overview").with_style(StyleHint::sized(20.0)));
        for _ in 0..3 {
            doc.add_element(
                DocumentElement::raw("regular body text line").with_style(StyleHint::sized(10.0)),
            );
        }
        let detection = detect(&doc);
        assert_eq!(detection.sections.len(), 1);
        assert_eq!(detection.sections[0].title, "Overview");
        assert_eq!(detection.sections[0].elements.len(), 3);
    }

    #[test]
    fn test_zero_budget_stops_early() {
        let mut doc = ExtractedDocument::new("a.txt", "text/plain");
        for i in 0..10 {
            doc.add_element(DocumentElement::raw(format!("# Heading {}", i)));
        }
        let options = AnalyzerOptions::new()
            .with_max_analysis_time(Duration::ZERO)
            .with_time_check_interval(3);
        let detection = SectionDetector::new(&options).detect(&doc, Instant::now());

        assert!(detection.budget_exceeded);
        assert_eq!(detection.processed_elements, 3);
        assert_eq!(detection.sections.len(), 3);
    }

    #[test]
    fn test_unit_counts() {
        let doc = ExtractedDocument::from_plain_text(
            "a.txt",
            "# Data\n\
             - one\n- two\n\n\
             Name\tQty\tPrice\n\n\
             This is a considerably long paragraph of text that should count as a paragraph.",
        );
        let detection = detect(&doc);
        assert_eq!(detection.lists, 1);
        assert_eq!(detection.tables, 1);
        assert_eq!(detection.paragraphs, 1);
    }
}
