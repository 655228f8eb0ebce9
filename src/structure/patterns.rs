//! Ordered rule table for classifying text units.
//!
//! Each text unit (a line or a blank-line separated block) is classified
//! in a fixed order: style-based header, pattern-based header, list item,
//! table, multi-line list, paragraph (by length), and finally plain text.
//! Within a category rules are tried by ascending precedence and the first
//! match wins, so two rules never fire for the same unit.

use regex::Regex;

use super::fonts::FontProfile;
use crate::error::{Error, Result};
use crate::model::{ListType, StyleHint};

/// Confidence of a header detected from style alone, scaled by style strength.
pub const STYLE_ONLY_WEIGHT: f32 = 0.6;

/// Confidence of the weak length-based paragraph heuristic.
pub const PARAGRAPH_CONFIDENCE: f32 = 0.3;

/// Confidence of unclassified text.
pub const TEXT_CONFIDENCE: f32 = 0.2;

/// What a rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    /// Section heading
    Header,
    /// List item marker
    List(ListType),
    /// Column separators
    Table,
}

/// How a header rule derives the heading level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRule {
    /// Always this level
    Fixed(u8),
    /// Number of leading `#` characters
    HashCount,
    /// Number of components in a leading `1.2.3` number
    NumberDepth,
}

/// A named, compiled classification rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Rule name, recorded in section metadata
    pub name: &'static str,
    /// Rule category
    pub category: RuleCategory,
    /// Compiled pattern
    pub pattern: Regex,
    /// Lower runs first within a category
    pub precedence: u16,
    /// Pattern-match strength in [0, 1]
    pub strength: f32,
    /// Level derivation for header rules
    pub level: LevelRule,
    /// Minimum number of uppercase letters in the unit
    pub min_uppercase: usize,
    /// Maximum number of words (0 = unlimited)
    pub max_words: usize,
    /// Reject units ending like a sentence (`.`, `,`, `;`)
    pub reject_sentence_end: bool,
    /// Whether the length limit on headers applies
    pub length_limited: bool,
}

impl PatternRule {
    /// Create a rule from a pattern string.
    pub fn new(
        name: &'static str,
        category: RuleCategory,
        pattern: &str,
        precedence: u16,
        strength: f32,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Other(format!("Invalid pattern for rule '{}': {}", name, e)))?;
        Ok(Self {
            name,
            category,
            pattern,
            precedence,
            strength: strength.clamp(0.0, 1.0),
            level: LevelRule::Fixed(1),
            min_uppercase: 0,
            max_words: 0,
            reject_sentence_end: false,
            length_limited: true,
        })
    }

    /// Set the level derivation.
    pub fn with_level(mut self, level: LevelRule) -> Self {
        self.level = level;
        self
    }

    /// Require a minimum number of uppercase letters.
    pub fn with_min_uppercase(mut self, count: usize) -> Self {
        self.min_uppercase = count;
        self
    }

    /// Limit the number of words.
    pub fn with_max_words(mut self, words: usize) -> Self {
        self.max_words = words;
        self
    }

    /// Reject sentence-like endings.
    pub fn rejecting_sentence_end(mut self) -> Self {
        self.reject_sentence_end = true;
        self
    }

    /// Exempt the rule from the header length limit.
    pub fn unlimited_length(mut self) -> Self {
        self.length_limited = false;
        self
    }

    /// Check whether the rule fires on a trimmed unit.
    pub fn matches(&self, text: &str, max_length: usize) -> bool {
        if self.length_limited && text.chars().count() > max_length {
            return false;
        }
        if self.max_words > 0 && text.split_whitespace().count() > self.max_words {
            return false;
        }
        if self.reject_sentence_end && text.ends_with(['.', ',', ';']) {
            return false;
        }
        if self.min_uppercase > 0
            && text.chars().filter(|c| c.is_uppercase()).count() < self.min_uppercase
        {
            return false;
        }
        self.pattern.is_match(text)
    }

    /// Heading level for a unit this rule matched.
    pub fn level_for(&self, text: &str) -> u8 {
        let level = match self.level {
            LevelRule::Fixed(level) => level,
            LevelRule::HashCount => text.chars().take_while(|c| *c == '#').count() as u8,
            LevelRule::NumberDepth => {
                let number: String = text
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                number
                    .trim_end_matches('.')
                    .split('.')
                    .filter(|part| !part.is_empty())
                    .count() as u8
            }
        };
        level.clamp(1, 6)
    }

    /// Title text for a header unit this rule matched.
    pub fn title_for(&self, text: &str) -> String {
        match self.level {
            LevelRule::HashCount => text.trim_start_matches('#').trim().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Kind of a classified text unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    /// Heading that starts a section
    Header {
        /// Heading level (1-6)
        level: u8,
    },
    /// Single list item
    ListItem(ListType),
    /// Tabular block
    Table,
    /// Block of several list items
    MultiLineList(ListType),
    /// Long running text
    Paragraph,
    /// Anything else
    Text,
}

/// Result of classifying one text unit.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Unit kind
    pub kind: UnitKind,
    /// Name of the rule that fired
    pub rule: &'static str,
    /// Title for header units
    pub title: Option<String>,
    /// Pattern-match strength in [0, 1] (0 when no pattern matched)
    pub pattern_strength: f32,
    /// Style-match strength in [0, 1] (0 when no style matched)
    pub style_strength: f32,
}

impl Classification {
    fn new(kind: UnitKind, rule: &'static str, pattern_strength: f32) -> Self {
        Self {
            kind,
            rule,
            title: None,
            pattern_strength,
            style_strength: 0.0,
        }
    }

    /// Check if the unit is a header.
    pub fn is_header(&self) -> bool {
        matches!(self.kind, UnitKind::Header { .. })
    }

    /// Combined confidence in [0, 1].
    ///
    /// Style and pattern together rank above pattern alone, which ranks above
    /// style alone and the length-based heuristics.
    pub fn confidence(&self) -> f32 {
        let p = self.pattern_strength;
        let s = self.style_strength;
        let combined = if p > 0.0 && s > 0.0 {
            p + (1.0 - p) * 0.5 * s
        } else if p > 0.0 {
            p
        } else {
            STYLE_ONLY_WEIGHT * s
        };
        combined.clamp(0.0, 1.0)
    }
}

/// Rule-table classifier for text units.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    rules: Vec<PatternRule>,
    min_paragraph_length: usize,
    max_header_length: usize,
}

impl PatternClassifier {
    /// Create a classifier with the built-in rule table.
    pub fn new(min_paragraph_length: usize, max_header_length: usize) -> Self {
        let mut classifier = Self {
            rules: builtin_rules(),
            min_paragraph_length,
            max_header_length,
        };
        classifier.sort_rules();
        classifier
    }

    /// Add a rule; it takes part in classification by its precedence.
    pub fn with_rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(rule);
        self.sort_rules();
        self
    }

    /// The rule table in evaluation order.
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    fn sort_rules(&mut self) {
        // Stable sort keeps insertion order for equal precedence.
        self.rules.sort_by_key(|r| r.precedence);
    }

    /// Find the first header rule matching a single line.
    pub fn header_rule(&self, line: &str) -> Option<&PatternRule> {
        let line = line.trim();
        self.rules
            .iter()
            .filter(|r| r.category == RuleCategory::Header)
            .find(|r| r.matches(line, self.max_header_length))
    }

    /// Find the first list rule matching a single line.
    pub fn list_rule(&self, line: &str) -> Option<&PatternRule> {
        let line = line.trim();
        self.rules
            .iter()
            .filter(|r| matches!(r.category, RuleCategory::List(_)))
            .find(|r| r.pattern.is_match(line))
    }

    fn is_table_line(&self, line: &str) -> bool {
        let line = line.trim();
        self.rules
            .iter()
            .filter(|r| r.category == RuleCategory::Table)
            .any(|r| r.pattern.find_iter(line).count() >= 2)
    }

    /// Classify a text unit.
    ///
    /// `style` should only be passed when the unit is the whole element the
    /// style belongs to.
    pub fn classify(
        &self,
        unit: &str,
        style: Option<&StyleHint>,
        fonts: &FontProfile,
    ) -> Classification {
        let unit = unit.trim();
        let lines: Vec<&str> = unit
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let single_line = lines.len() == 1;

        if single_line {
            if let Some(c) = self.classify_header(unit, style, fonts) {
                return c;
            }
        }

        if single_line {
            if let Some(rule) = self.list_rule(unit) {
                if let RuleCategory::List(list_type) = rule.category {
                    return Classification::new(
                        UnitKind::ListItem(list_type),
                        rule.name,
                        rule.strength,
                    );
                }
            }
        }

        if !lines.is_empty() {
            let table_lines = lines.iter().filter(|l| self.is_table_line(l)).count();
            if table_lines * 2 >= lines.len() && table_lines > 0 {
                return Classification::new(UnitKind::Table, "column_separators", 0.7);
            }
        }

        if lines.len() >= 2 {
            let list_rules: Vec<&PatternRule> =
                lines.iter().filter_map(|l| self.list_rule(l)).collect();
            if list_rules.len() * 2 >= lines.len() {
                if let Some(RuleCategory::List(list_type)) = list_rules.first().map(|r| r.category)
                {
                    return Classification::new(
                        UnitKind::MultiLineList(list_type),
                        "multi_line_list",
                        0.6,
                    );
                }
            }
        }

        if unit.chars().count() >= self.min_paragraph_length {
            return Classification::new(
                UnitKind::Paragraph,
                "paragraph_length",
                PARAGRAPH_CONFIDENCE,
            );
        }

        Classification::new(UnitKind::Text, "text", TEXT_CONFIDENCE)
    }

    fn classify_header(
        &self,
        line: &str,
        style: Option<&StyleHint>,
        fonts: &FontProfile,
    ) -> Option<Classification> {
        let rule = self.header_rule(line);
        let within_length = line.chars().count() <= self.max_header_length;
        let style_match = if within_length {
            fonts.style_match(style)
        } else {
            None
        };

        // Style check comes first; a pattern match only strengthens it.
        if let Some((style_strength, style_level)) = style_match {
            let level = rule
                .map(|r| r.level_for(line))
                .or(style_level)
                .unwrap_or(1);
            let mut c = Classification::new(
                UnitKind::Header { level },
                "style_header",
                rule.map(|r| r.strength).unwrap_or(0.0),
            );
            c.style_strength = style_strength;
            c.title = Some(rule.map(|r| r.title_for(line)).unwrap_or_else(|| line.to_string()));
            if c.confidence() >= STYLE_ONLY_WEIGHT * 0.9 || rule.is_some() {
                return Some(c);
            }
        }

        let rule = rule?;
        let mut c = Classification::new(
            UnitKind::Header {
                level: rule.level_for(line),
            },
            rule.name,
            rule.strength,
        );
        c.title = Some(rule.title_for(line));
        Some(c)
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(50, 120)
    }
}

fn builtin(
    name: &'static str,
    category: RuleCategory,
    pattern: &str,
    precedence: u16,
    strength: f32,
) -> PatternRule {
    PatternRule::new(name, category, pattern, precedence, strength).expect("built-in pattern")
}

fn builtin_rules() -> Vec<PatternRule> {
    vec![
        // Headers
        builtin("markdown_header", RuleCategory::Header, r"^#{1,6}\s+\S", 10, 0.95)
            .with_level(LevelRule::HashCount)
            .unlimited_length(),
        builtin(
            "chapter_header",
            RuleCategory::Header,
            r"(?i)^(?:chapter|глава)\s+(?:\d+|[ivxlcdm]+)\b",
            20,
            0.9,
        )
        .with_level(LevelRule::Fixed(1)),
        builtin(
            "section_header",
            RuleCategory::Header,
            r"(?i)^(?:section|раздел)\s+(?:\d+(?:\.\d+)*|[ivxlcdm]+)\b",
            30,
            0.85,
        )
        .with_level(LevelRule::Fixed(2))
        .rejecting_sentence_end(),
        builtin(
            "numbered_caps_header",
            RuleCategory::Header,
            r"^\d+(?:\.\d+)*\.?\s+[^\p{Ll}]+$",
            40,
            0.8,
        )
        .with_level(LevelRule::NumberDepth)
        .with_min_uppercase(2),
        builtin(
            "numbered_title_header",
            RuleCategory::Header,
            r"^\d+(?:\.\d+)+\.?\s+\p{Lu}",
            50,
            0.7,
        )
        .with_level(LevelRule::NumberDepth)
        .with_max_words(12)
        .rejecting_sentence_end(),
        builtin("all_caps_header", RuleCategory::Header, r"^[^\p{Ll}]+$", 60, 0.65)
            .with_level(LevelRule::Fixed(1))
            .with_min_uppercase(3)
            .with_max_words(12)
            .rejecting_sentence_end(),
        // Lists
        builtin(
            "bullet_list",
            RuleCategory::List(ListType::Bullet),
            r"^[•\-\*–—●○▪■►◦]\s+\S",
            100,
            0.8,
        ),
        builtin(
            "numbered_list",
            RuleCategory::List(ListType::Numbered),
            r"^\d{1,3}[.)]\s+\S",
            110,
            0.75,
        ),
        builtin(
            "roman_list",
            RuleCategory::List(ListType::Roman),
            r"^(?i:[ivx]{1,5})[.)]\s+\S",
            120,
            0.7,
        ),
        builtin(
            "lettered_list",
            RuleCategory::List(ListType::Lettered),
            r"^\p{L}[.)]\s+\S",
            130,
            0.7,
        ),
        // Tables
        builtin("column_separator", RuleCategory::Table, r"\t+| {2,}|\|", 200, 0.7),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PatternClassifier {
        PatternClassifier::default()
    }

    fn classify(text: &str) -> Classification {
        classifier().classify(text, None, &FontProfile::default())
    }

    #[test]
    fn test_markdown_header() {
        let c = classify("## Payment terms");
        assert_eq!(c.kind, UnitKind::Header { level: 2 });
        assert_eq!(c.rule, "markdown_header");
        assert_eq!(c.title.as_deref(), Some("Payment terms"));
    }

    #[test]
    fn test_numbered_caps_header() {
        let c = classify("1. PREDMET");
        assert_eq!(c.kind, UnitKind::Header { level: 1 });
        assert_eq!(c.rule, "numbered_caps_header");
        assert_eq!(c.title.as_deref(), Some("1. PREDMET"));

        let c = classify("2.1 OPLATA USLUG");
        assert_eq!(c.kind, UnitKind::Header { level: 2 });
    }

    #[test]
    fn test_chapter_and_section_headers() {
        assert_eq!(classify("Chapter 3").kind, UnitKind::Header { level: 1 });
        assert_eq!(classify("Глава 2 Общие положения").kind, UnitKind::Header { level: 1 });
        assert_eq!(classify("Раздел 4").kind, UnitKind::Header { level: 2 });
        assert_eq!(classify("Section 2.1 Scope").kind, UnitKind::Header { level: 2 });
    }

    #[test]
    fn test_all_caps_header() {
        let c = classify("GENERAL PROVISIONS");
        assert_eq!(c.rule, "all_caps_header");
        assert!(classify("OK").kind != UnitKind::Header { level: 1 });
    }

    #[test]
    fn test_numbered_sentence_is_list_not_header() {
        let c = classify("1. The parties agree");
        assert_eq!(c.kind, UnitKind::ListItem(ListType::Numbered));
    }

    #[test]
    fn test_list_kinds() {
        assert_eq!(classify("• item").kind, UnitKind::ListItem(ListType::Bullet));
        assert_eq!(classify("- item").kind, UnitKind::ListItem(ListType::Bullet));
        assert_eq!(classify("iv) item").kind, UnitKind::ListItem(ListType::Roman));
        assert_eq!(classify("b) item").kind, UnitKind::ListItem(ListType::Lettered));
    }

    #[test]
    fn test_table_block() {
        let c = classify("Name\tQty\tPrice\nApple\t2\t1.50");
        assert_eq!(c.kind, UnitKind::Table);

        let c = classify("| a | b |");
        assert_eq!(c.kind, UnitKind::Table);
    }

    #[test]
    fn test_multi_line_list() {
        let c = classify("- first\n- second\n- third");
        assert_eq!(c.kind, UnitKind::MultiLineList(ListType::Bullet));
    }

    #[test]
    fn test_paragraph_and_text_fallback() {
        let long = "This agreement is made between the parties named below on the date written.";
        assert_eq!(classify(long).kind, UnitKind::Paragraph);
        assert_eq!(classify("short words here").kind, UnitKind::Text);
    }

    #[test]
    fn test_long_line_is_not_header() {
        let line = "A".repeat(200);
        assert!(!classify(&line).is_header());
    }

    #[test]
    fn test_style_header_without_pattern() {
        let mut fonts = FontProfile::default();
        for _ in 0..5 {
            fonts.add_size(11.0);
        }
        fonts.add_size(18.0);
        fonts.analyze();

        let style = StyleHint::sized(18.0);
        let c = classifier().classify("Introduction", Some(&style), &fonts);
        assert_eq!(c.kind, UnitKind::Header { level: 1 });
        assert_eq!(c.rule, "style_header");
        assert!((c.confidence() - STYLE_ONLY_WEIGHT).abs() < 1e-6);
    }

    #[test]
    fn test_style_and_pattern_beats_pattern_only() {
        let mut fonts = FontProfile::default();
        for _ in 0..5 {
            fonts.add_size(11.0);
        }
        fonts.add_size(16.0);
        fonts.analyze();

        let style = StyleHint::sized(16.0);
        let both = classifier().classify("# Scope", Some(&style), &fonts);
        let pattern_only = classify("# Scope");
        assert!(both.confidence() > pattern_only.confidence());
        assert!(pattern_only.confidence() > PARAGRAPH_CONFIDENCE);
    }

    #[test]
    fn test_bold_only_is_too_weak_for_header() {
        let style = StyleHint::bold();
        let c = classifier().classify("Introduction", Some(&style), &FontProfile::default());
        assert!(!c.is_header());
    }

    #[test]
    fn test_custom_rule_is_additive() {
        let rule = PatternRule::new("article_header", RuleCategory::Header, r"^Article\s+\d+", 5, 0.9)
            .unwrap()
            .with_level(LevelRule::Fixed(1));
        let classifier = PatternClassifier::default().with_rule(rule);
        assert_eq!(classifier.rules()[0].name, "article_header");
        let c = classifier.classify("Article 7", None, &FontProfile::default());
        assert_eq!(c.rule, "article_header");
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let rule = PatternRule::new("broken", RuleCategory::Header, r"(", 1, 0.5);
        assert!(rule.is_err());
    }
}
