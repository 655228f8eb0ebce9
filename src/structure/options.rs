//! Structure analysis options and configuration.

use std::time::Duration;

use super::anchor::AnchorOptions;

/// Options for structure analysis.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Sections below this confidence are dropped (at least one survives)
    pub min_confidence_threshold: f32,

    /// Maximum number of elements accepted per document
    pub max_elements: usize,

    /// Soft wall-clock budget per document
    pub max_analysis_time: Duration,

    /// Check the budget every N text units
    pub time_check_interval: usize,

    /// Minimum length for a block to count as a paragraph
    pub min_paragraph_length: usize,

    /// Lines longer than this are never headers (markdown excepted)
    pub max_header_length: usize,

    /// Anchor generation options
    pub anchor: AnchorOptions,

    /// Whether `analyze_batch` uses the rayon pool
    pub parallel: bool,
}

impl AnalyzerOptions {
    /// Create new analyzer options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum confidence threshold.
    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the element ceiling.
    pub fn with_max_elements(mut self, max: usize) -> Self {
        self.max_elements = max;
        self
    }

    /// Set the time budget.
    pub fn with_max_analysis_time(mut self, budget: Duration) -> Self {
        self.max_analysis_time = budget;
        self
    }

    /// Set how often the time budget is checked.
    pub fn with_time_check_interval(mut self, interval: usize) -> Self {
        self.time_check_interval = interval.max(1);
        self
    }

    /// Set the minimum paragraph length.
    pub fn with_min_paragraph_length(mut self, length: usize) -> Self {
        self.min_paragraph_length = length;
        self
    }

    /// Set the maximum header length.
    pub fn with_max_header_length(mut self, length: usize) -> Self {
        self.max_header_length = length;
        self
    }

    /// Set anchor options.
    pub fn with_anchor_options(mut self, anchor: AnchorOptions) -> Self {
        self.anchor = anchor;
        self
    }

    /// Disable parallel batch processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.5,
            max_elements: 10_000,
            max_analysis_time: Duration::from_secs(30),
            time_check_interval: 100,
            min_paragraph_length: 50,
            max_header_length: 120,
            anchor: AnchorOptions::default(),
            parallel: true,
        }
    }
}
