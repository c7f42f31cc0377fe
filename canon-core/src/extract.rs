//! Best-effort structured extraction from model output.
//!
//! The reviewer is asked to respond with ONLY a JSON object, but the
//! response may wrap it in markdown fences, preface it with prose, or
//! trail off into commentary. Extraction tries a fixed fallback order
//! and the first successful parse wins: fenced code block, then a
//! narrow pattern around the expected `"issues"` key, then the
//! outermost balanced `{...}`/`[...]` substring.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// Narrow pattern for the expected review envelope.
    static ref ISSUES_OBJECT: Regex =
        Regex::new(r#"(?s)\{\s*"issues"\s*:\s*\[.*?\]\s*\}"#).expect("static regex");
}

/// Extract the first parseable JSON structure from free text.
pub fn extract_structured(text: &str) -> Option<Value> {
    if let Some(block) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Some(value);
        }
    }

    if let Some(found) = ISSUES_OBJECT.find(text) {
        if let Ok(value) = serde_json::from_str(found.as_str()) {
            return Some(value);
        }
    }

    if let Some(slice) = balanced_slice(text) {
        if let Ok(value) = serde_json::from_str(slice) {
            return Some(value);
        }
    }

    None
}

/// Content of the first ```json or ``` fence, if any.
fn fenced_block(text: &str) -> Option<&str> {
    for marker in ["```json", "```"] {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(&text[content_start..content_start + end]);
            }
        }
    }
    None
}

/// The outermost balanced `{...}` or `[...]` substring starting at the
/// first opening bracket, honoring string literals and escapes. `None`
/// when the structure never closes.
fn balanced_slice(text: &str) -> Option<&str> {
    let open_pos = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (pos, c) in text[open_pos..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[open_pos..open_pos + pos + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
