//! Font size statistics for style-based header detection.

use std::collections::HashMap;

use crate::model::{ExtractedDocument, StyleHint};

/// Body and heading font sizes observed in a document.
#[derive(Debug, Clone, Default)]
pub struct FontProfile {
    /// Body text font size (most common), if any size was observed
    pub body_size: Option<f32>,
    /// Sizes noticeably larger than body, largest first
    pub heading_sizes: Vec<f32>,
    /// Observed sizes at 0.1pt precision with frequency
    size_histogram: HashMap<i32, usize>,
}

impl FontProfile {
    /// Build a profile from every element carrying a font size.
    pub fn from_document(doc: &ExtractedDocument) -> Self {
        let mut profile = Self::default();
        for element in &doc.elements {
            if let Some(size) = element.style.as_ref().and_then(|s| s.font_size) {
                profile.add_size(size);
            }
        }
        profile.analyze();
        profile
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        let key = (size * 10.0) as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Calculate body size and heading sizes.
    pub fn analyze(&mut self) {
        // Ties go to the smaller size so the result is deterministic.
        let Some((&body_key, _)) = self
            .size_histogram
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        else {
            self.body_size = None;
            self.heading_sizes.clear();
            return;
        };
        let body = body_key as f32 / 10.0;
        self.body_size = Some(body);

        let mut larger: Vec<f32> = self
            .size_histogram
            .keys()
            .map(|k| *k as f32 / 10.0)
            .filter(|size| *size >= body + 1.5)
            .collect();
        larger.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        self.heading_sizes = larger;
    }

    /// Heading level for a font size (1-6), or 0 for body text.
    pub fn heading_level(&self, font_size: f32) -> u8 {
        let Some(body) = self.body_size else {
            return 0;
        };
        if font_size < body + 1.5 {
            return 0;
        }
        for (i, &heading_size) in self.heading_sizes.iter().enumerate() {
            if font_size >= heading_size - 0.5 {
                return (i + 1).min(6) as u8;
            }
        }
        5
    }

    /// Style match for a unit: `(strength, level)`.
    ///
    /// A size-based match is full strength; a bold-only match is weaker and
    /// carries no level.
    pub fn style_match(&self, style: Option<&StyleHint>) -> Option<(f32, Option<u8>)> {
        let style = style?;
        if let Some(size) = style.font_size {
            let level = self.heading_level(size);
            if level > 0 {
                return Some((1.0, Some(level)));
            }
        }
        if style.bold {
            return Some((0.6, None));
        }
        None
    }
}
