//! Best-effort JSON recovery from model text
//!
//! Models wrap JSON in prose, code fences, or both. Recovery tries, in order:
//! the whole text, the first fenced code block, then balanced `{...}` / `[...]`
//! spans starting at each opener (string- and escape-aware).

use serde_json::Value;

/// Upper bound on opener positions tried by the span scan
const MAX_SPAN_CANDIDATES: usize = 32;

/// Parse `text` as JSON, falling back to embedded JSON when needed
pub fn parse_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(block) = extract_code_block(trimmed) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Some(value);
        }
    }

    extract_balanced(trimmed)
}

/// Content of the first ``` fenced block (language tag skipped)
pub fn extract_code_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];

    // Language tag runs to the end of the line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];

    let close = body.find("```")?;
    Some(&body[..close])
}

/// First balanced JSON span that parses
pub fn extract_balanced(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .take(MAX_SPAN_CANDIDATES)
        .find_map(|(start, _)| {
            balanced_span(text, start).and_then(|span| serde_json::from_str(span).ok())
        })
}

/// Slice from `start` through its matching closer, if any
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
