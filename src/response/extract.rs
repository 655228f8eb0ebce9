//! Locating the JSON payload inside model output.
//!
//! Models wrap JSON in reasoning blocks, Markdown fences and prose. The
//! helpers here peel those layers off without touching the payload.

use once_cell::sync::Lazy;
use regex::Regex;

static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("think block pattern"));

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("code fence pattern")
});

/// Remove `<think>...</think>` reasoning blocks.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_RE.replace_all(text, "").into_owned()
}

/// Return the contents of the first fenced code block holding JSON-like
/// text, or the trimmed input when there is none.
///
/// An opening fence without a closing one yields everything after the
/// opening line.
pub fn strip_code_fences(text: &str) -> &str {
    for caps in FENCE_RE.captures_iter(text) {
        if let Some(body) = caps.get(1) {
            let body = body.as_str().trim();
            if body.starts_with('{') || body.starts_with('[') {
                return body;
            }
        }
    }

    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        return body.trim_end().trim_end_matches("```").trim();
    }
    trimmed
}

/// Slice from the first opening brace to the last matching closer.
///
/// The outermost `{...}` object wins. A top-level array is kept only when
/// it encloses that object or no object exists, so bracketed prose such as
/// `[1]` before the payload is skipped. When the closer is missing the
/// slice runs to the end so repair can close it.
pub fn outermost_json(text: &str) -> &str {
    let object_start = text.find('{');
    let array_start = text.find('[');

    let (start, close) = match (object_start, array_start) {
        (Some(obj), Some(arr)) if arr < obj => match balanced_end(text, arr) {
            Some(end) if end < obj => (obj, '}'),
            _ => (arr, ']'),
        },
        (Some(obj), _) => (obj, '}'),
        (None, Some(arr)) => (arr, ']'),
        (None, None) => return text.trim(),
    };
    match text.rfind(close) {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}

/// Byte index of the closer matching the opener at `start`, skipping
/// string literals. `None` when the input ends first.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best JSON candidate in raw model output.
pub fn extract_json_candidate(raw: &str) -> String {
    let without_think = strip_think_blocks(raw);
    outermost_json(strip_code_fences(&without_think))
        .trim()
        .to_string()
}
