//! Single-pass structural repair of malformed JSON.
//!
//! Handles the usual ways model output breaks: truncation mid-object,
//! trailing commas, stray closers, unterminated strings, a key left
//! without a value, and raw newlines inside strings. Anything beyond that
//! is left for the second parse to reject.

use serde_json::Value;

use crate::error::{Error, Result};

/// Repair `text` structurally. The output is not guaranteed to parse.
pub fn repair_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    // Non-whitespace character emitted before the current string opened.
    let mut before_string: Option<char> = None;
    let mut last_was_string = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else if c == '\\' {
                escaped = true;
                out.push(c);
            } else if c == '"' {
                in_string = false;
                last_was_string = true;
                out.push(c);
            } else if c == '\n' {
                out.push_str("\\n");
            } else if c == '\r' {
                out.push_str("\\r");
            } else if c == '\t' {
                out.push_str("\\t");
            } else {
                out.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                before_string = last_significant(&out);
                in_string = true;
                out.push(c);
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                if closers.contains(&c) {
                    // Close any brackets left open inside this one.
                    while let Some(expected) = closers.pop() {
                        drop_trailing_comma(&mut out);
                        out.push(expected);
                        if expected == c {
                            break;
                        }
                    }
                }
            }
            _ => {
                out.push(c);
            }
        }

        if !c.is_whitespace() && c != '"' {
            last_was_string = false;
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
        last_was_string = true;
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    drop_trailing_comma(&mut out);

    if out.ends_with(':') {
        out.push_str(" null");
    } else if last_was_string
        && closers.last() == Some(&'}')
        && matches!(before_string, Some('{') | Some(','))
    {
        // A dangling object key.
        out.push_str(": null");
    }

    while let Some(closer) = closers.pop() {
        drop_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

/// Parse JSON, repairing it once if needed.
///
/// Returns the value and whether repair was used. Input longer than
/// `max_repair_input` bytes is never repaired.
pub fn parse_with_repair(candidate: &str, max_repair_input: usize) -> Result<(Value, bool)> {
    if candidate.trim().is_empty() {
        return Err(Error::Parsing("Response contains no JSON".to_string()));
    }

    let first = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok((value, false)),
        Err(e) => e,
    };
    let diagnostic = format!(
        "Invalid JSON at line {}, column {}: {}",
        first.line(),
        first.column(),
        first
    );

    if candidate.len() > max_repair_input {
        return Err(Error::Parsing(format!(
            "{} (input of {} bytes exceeds repair limit of {})",
            diagnostic,
            candidate.len(),
            max_repair_input
        )));
    }

    let repaired = repair_json(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            log::debug!("Repaired malformed JSON ({})", diagnostic);
            Ok((value, true))
        }
        Err(second) => Err(Error::Parsing(format!(
            "{}; repair failed at line {}, column {}",
            diagnostic,
            second.line(),
            second.column()
        ))),
    }
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repaired(text: &str) -> Value {
        serde_json::from_str(&repair_json(text)).unwrap()
    }

    #[test]
    fn test_missing_closing_brace() {
        assert_eq!(repaired(r#"{"a":1,"b":2"#), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(repaired(r#"{"a": [1, 2,], "b": 3,}"#), json!({"a": [1, 2], "b": 3}));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(repaired(r#"{"a": "hello"#), json!({"a": "hello"}));
    }

    #[test]
    fn test_dangling_colon_and_key() {
        assert_eq!(repaired(r#"{"a": 1, "b":"#), json!({"a": 1, "b": null}));
        assert_eq!(repaired(r#"{"a": 1, "b""#), json!({"a": 1, "b": null}));
    }

    #[test]
    fn test_nested_truncation() {
        assert_eq!(
            repaired(r#"{"items": [{"anchor": "x", "n": 2}, {"anchor": "y""#),
            json!({"items": [{"anchor": "x", "n": 2}, {"anchor": "y"}]})
        );
    }

    #[test]
    fn test_stray_and_mismatched_closers() {
        assert_eq!(repaired(r#"{"a": 1}}"#), json!({"a": 1}));
        assert_eq!(repaired(r#"{"a": [1, 2}"#), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_raw_newline_in_string() {
        assert_eq!(repaired("{\"a\": \"one\ntwo\"}"), json!({"a": "one\ntwo"}));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        assert_eq!(repaired(r#"{"a": "x}]""#), json!({"a": "x}]"}));
    }

    #[test]
    fn test_parse_with_repair_reports_repair() {
        let (value, repaired) = parse_with_repair(r#"{"a":1,"b":2"#, 1024).unwrap();
        assert_eq!(value, json!({"a": 1, "b": 2}));
        assert!(repaired);

        let (_, repaired) = parse_with_repair(r#"{"a":1}"#, 1024).unwrap();
        assert!(!repaired);
    }

    #[test]
    fn test_parse_with_repair_diagnostic() {
        let err = parse_with_repair("{\"a\": tru", 1024).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 1"));
        assert!(matches!(err, Error::Parsing(_)));
    }

    #[test]
    fn test_repair_limit() {
        let err = parse_with_repair(r#"{"a":1"#, 3).unwrap_err();
        assert!(err.to_string().contains("repair limit"));
    }

    #[test]
    fn test_empty_candidate() {
        assert!(parse_with_repair("   ", 1024).is_err());
    }
}
