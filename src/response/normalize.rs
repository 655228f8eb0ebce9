//! Normalization of parsed JSON values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?$").expect("numeric pattern")
});
static HORIZONTAL_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("whitespace pattern"));
static BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*)+").expect("blank line pattern"));

/// Switches for [`normalize_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Turn strings like `"42"` or `"0.5"` into numbers
    pub coerce_numeric_strings: bool,
    /// Trim strings and collapse whitespace runs
    pub collapse_whitespace: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            coerce_numeric_strings: true,
            collapse_whitespace: true,
        }
    }
}

/// Normalize every string leaf of `value`, recursing through arrays and
/// objects. Object keys are trimmed.
pub fn normalize_value(value: Value, options: NormalizeOptions) -> Value {
    match value {
        Value::String(s) => normalize_string(s, options),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_value(item, options))
                .collect(),
        ),
        Value::Object(map) => {
            let mut normalized = Map::with_capacity(map.len());
            for (key, item) in map {
                normalized.insert(key.trim().to_string(), normalize_value(item, options));
            }
            Value::Object(normalized)
        }
        other @ (Value::Null | Value::Bool(_) | Value::Number(_)) => other,
    }
}

fn normalize_string(s: String, options: NormalizeOptions) -> Value {
    let text = if options.collapse_whitespace {
        collapse_whitespace(&s)
    } else {
        s
    };

    if options.coerce_numeric_strings {
        if let Some(number) = parse_number(text.trim()) {
            return Value::Number(number);
        }
    }
    Value::String(text)
}

/// Trim, collapse horizontal whitespace to one space, and collapse blank
/// line runs to a single blank line.
pub fn collapse_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let single_spaced = HORIZONTAL_WS_RE.replace_all(&text, " ");
    let paragraphs = BLANK_LINES_RE.replace_all(&single_spaced, |caps: &regex::Captures| {
        if caps[0].matches('\n').count() > 1 {
            "\n\n"
        } else {
            "\n"
        }
    });
    paragraphs
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse a numeric-looking string. Leading zeros (`"007"`) are kept as
/// strings.
///
/// Integers must fit in `i64`. Fractions and exponents are coerced only
/// when they carry at most 15 significant digits, which `f64` holds
/// exactly; longer values such as account numbers stay strings.
pub fn parse_number(text: &str) -> Option<Number> {
    if !NUMERIC_RE.is_match(text) {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    if !text.contains(&['.', 'e', 'E'][..]) || significant_digits(text) > F64_EXACT_DIGITS {
        return None;
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

const F64_EXACT_DIGITS: usize = 15;

fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(&['e', 'E'][..]).next().unwrap_or(text);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}
