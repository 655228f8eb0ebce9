//! Section anchor generation and substitution.
//!
//! Anchors are literal markers such as `<!-- SECTION_ANCHOR_section_1_scope -->`
//! embedded in document text. The allocator owns the set of ids issued in
//! one analysis run; create one per run (or call [`AnchorAllocator::reset`])
//! so separate documents never share or leak anchors.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Default marker prefix.
pub const DEFAULT_ANCHOR_PREFIX: &str = "<!-- SECTION_ANCHOR_";

/// Default marker suffix.
pub const DEFAULT_ANCHOR_SUFFIX: &str = " -->";

/// Title used when normalization leaves nothing.
const EMPTY_TITLE: &str = "section";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static SEPARATOR_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("separator pattern"));
static UNDERSCORE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("underscore pattern"));

/// Anchor formatting options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorOptions {
    /// Text placed before the anchor id
    pub prefix: String,
    /// Text placed after the anchor id
    pub suffix: String,
    /// Titles are truncated to this many characters before normalization
    pub max_title_length: usize,
    /// Map Cyrillic letters to Latin
    pub transliterate: bool,
    /// Lowercase the normalized title
    pub lowercase: bool,
}

impl AnchorOptions {
    /// Create new anchor options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the marker prefix and suffix.
    pub fn with_markers(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.suffix = suffix.into();
        self
    }

    /// Set the title length limit.
    pub fn with_max_title_length(mut self, length: usize) -> Self {
        self.max_title_length = length;
        self
    }

    /// Enable or disable transliteration.
    pub fn with_transliteration(mut self, enabled: bool) -> Self {
        self.transliterate = enabled;
        self
    }

    /// Enable or disable lowercasing.
    pub fn with_lowercase(mut self, enabled: bool) -> Self {
        self.lowercase = enabled;
        self
    }
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ANCHOR_PREFIX.to_string(),
            suffix: DEFAULT_ANCHOR_SUFFIX.to_string(),
            max_title_length: 50,
            transliterate: true,
            lowercase: true,
        }
    }
}

/// Per-run anchor allocator.
#[derive(Debug, Clone, Default)]
pub struct AnchorAllocator {
    options: AnchorOptions,
    used: HashSet<String>,
}

impl AnchorAllocator {
    /// Create an allocator with the given options.
    pub fn new(options: AnchorOptions) -> Self {
        Self {
            options,
            used: HashSet::new(),
        }
    }

    /// Anchor options in use.
    pub fn options(&self) -> &AnchorOptions {
        &self.options
    }

    /// Forget every issued anchor.
    pub fn reset(&mut self) {
        self.used.clear();
    }

    /// Number of anchors issued since the last reset.
    pub fn issued_count(&self) -> usize {
        self.used.len()
    }

    /// Check whether an anchor id was issued.
    pub fn is_issued(&self, anchor_id: &str) -> bool {
        self.used.contains(anchor_id)
    }

    /// Normalize a title into the `[a-z0-9_]` form used in anchor ids.
    pub fn normalize_title(&self, title: &str) -> String {
        let without_tags = TAG_RE.replace_all(title, " ");
        let flattened: String = without_tags
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        let truncated: String = flattened
            .trim()
            .chars()
            .take(self.options.max_title_length)
            .collect();

        let transliterated = if self.options.transliterate {
            transliterate(&truncated)
        } else {
            truncated
        };

        let ascii: String = transliterated
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
            .collect();

        let joined = SEPARATOR_RUN_RE.replace_all(&ascii, "_");
        let collapsed = UNDERSCORE_RUN_RE.replace_all(&joined, "_");
        let trimmed = collapsed.trim_matches('_');

        let normalized = if self.options.lowercase {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        };

        if normalized.is_empty() {
            EMPTY_TITLE.to_string()
        } else {
            normalized
        }
    }

    /// Generate a unique anchor id (without prefix and suffix).
    pub fn generate_id(&mut self, section_id: &str, title: &str) -> String {
        let base = format!("{}_{}", section_id, self.normalize_title(title));
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    /// Generate a unique anchor and wrap it in the marker format.
    pub fn generate(&mut self, section_id: &str, title: &str) -> String {
        let id = self.generate_id(section_id, title);
        self.wrap(&id)
    }

    /// Generate anchors for `(section_id, title)` pairs in order.
    ///
    /// Returns `(section_id, marker)` pairs; identical titles still yield
    /// distinct anchors.
    pub fn generate_batch<S, T>(&mut self, entries: &[(S, T)]) -> Vec<(String, String)>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        entries
            .iter()
            .map(|(id, title)| {
                let marker = self.generate(id.as_ref(), title.as_ref());
                (id.as_ref().to_string(), marker)
            })
            .collect()
    }

    /// Wrap an anchor id in the marker format.
    pub fn wrap(&self, anchor_id: &str) -> String {
        format!("{}{}{}", self.options.prefix, anchor_id, self.options.suffix)
    }

    /// Strip prefix and suffix from a marker, if it is one.
    pub fn unwrap_marker<'a>(&self, marker: &'a str) -> Option<&'a str> {
        marker
            .trim()
            .strip_prefix(self.options.prefix.as_str())?
            .strip_suffix(self.options.suffix.as_str())
    }

    /// Locate every marker in `text` as `(byte range, anchor id)`.
    pub fn find_markers(&self, text: &str) -> Vec<(Range<usize>, String)> {
        let prefix = self.options.prefix.as_str();
        let suffix = self.options.suffix.as_str();
        let mut found = Vec::new();
        if prefix.is_empty() {
            return found;
        }

        let mut cursor = 0;
        while let Some(offset) = text[cursor..].find(prefix) {
            let start = cursor + offset;
            let id_start = start + prefix.len();
            let id_end = if suffix.is_empty() {
                text[id_start..]
                    .find(char::is_whitespace)
                    .map(|i| id_start + i)
                    .unwrap_or(text.len())
            } else {
                match text[id_start..].find(suffix) {
                    Some(i) => id_start + i,
                    None => break,
                }
            };
            let end = id_end + suffix.len();
            found.push((start..end, text[id_start..id_end].to_string()));
            cursor = end;
        }
        found
    }

    /// Replace the marker for `anchor_id` with `content`, verbatim.
    ///
    /// `anchor_id` may be the full marker, the exact anchor id, or the
    /// section id the anchor was generated from. A missing anchor id never
    /// resolves to one of its `_N` duplicates. When no marker matches the
    /// text is returned unchanged.
    pub fn replace_anchor(&self, text: &str, anchor_id: &str, content: &str) -> String {
        let id = self.unwrap_marker(anchor_id).unwrap_or(anchor_id);
        let markers = self.find_markers(text);

        let target = markers
            .iter()
            .find(|(_, found)| found == id)
            .or_else(|| {
                markers
                    .iter()
                    .find(|(_, found)| generated_from_section(found, id))
            });

        match target {
            Some((range, _)) => {
                let marker = &text[range.clone()];
                text.replace(marker, content)
            }
            None => {
                log::debug!("Anchor '{}' not found in text, nothing replaced", id);
                text.to_string()
            }
        }
    }
}

/// Whether `anchor_id` was generated from `section_id` plus a title.
///
/// A purely numeric remainder is a duplicate counter, not a title, unless
/// `section_id` has the detector's own shape (`main`, `section_N`).
fn generated_from_section(anchor_id: &str, section_id: &str) -> bool {
    let Some(rest) = anchor_id
        .strip_prefix(section_id)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    !rest.chars().all(|c| c.is_ascii_digit() || c == '_') || is_detector_section_id(section_id)
}

fn is_detector_section_id(id: &str) -> bool {
    id == "main"
        || id
            .strip_prefix("section_")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Transliterate Cyrillic letters to Latin, keeping case.
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        match cyrillic_to_latin(lower) {
            Some(latin) if c.is_uppercase() => {
                let mut chars = latin.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            }
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' | 'і' => "i",
        'й' | 'ы' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ю' => "yu",
        'я' => "ya",
        'є' => "ye",
        'ї' => "yi",
        _ => return None,
    };
    Some(latin)
}
