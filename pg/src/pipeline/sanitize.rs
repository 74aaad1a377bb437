//! Recovery of structured payloads from free-form model text
//!
//! Every function here only removes characters, so each output is a
//! subsequence of its input.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think\b[^>]*>.*?</think>").expect("think-block pattern is valid"));

const PLAN_OPEN: &str = "<plan";
const PLAN_CLOSE: &str = "</plan>";

/// Remove `<think>...</think>` commentary and trim
pub fn strip_think_blocks(raw: &str) -> String {
    THINK_BLOCK.replace_all(raw, "").trim().to_string()
}

/// Drop a leading fence line (```` ```json ````) and everything from the last closing fence
pub fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();
    if !s.starts_with("```") {
        return s;
    }

    let mut body = s;
    if let Some(newline) = body.find('\n') {
        body = &body[newline + 1..];
    }
    if let Some(fence) = body.rfind("```") {
        body = &body[..fence];
    }
    body.trim()
}

/// Cut to the span from the first `{` to the last `}`
///
/// Input without such a span is returned unchanged.
pub fn trim_to_outer_json_object(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(first), Some(last)) if first <= last => &s[first..=last],
        _ => s,
    }
}

/// Remove `//` line comments and `/* */` block comments outside string literals
///
/// An unterminated block comment is left in place.
pub fn remove_json_comments(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copy_from = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        match (b, bytes.get(i + 1)) {
            (b'"', _) => {
                in_string = true;
                i += 1;
            }
            (b'/', Some(b'/')) => {
                out.push_str(&s[copy_from..i]);
                let end = s[i..].find('\n').map_or(bytes.len(), |n| i + n);
                i = end;
                copy_from = end;
            }
            (b'/', Some(b'*')) => match s[i + 2..].find("*/") {
                Some(n) => {
                    out.push_str(&s[copy_from..i]);
                    i += 2 + n + 2;
                    copy_from = i;
                }
                None => i += 2,
            },
            _ => i += 1,
        }
    }

    if copy_from < s.len() {
        out.push_str(&s[copy_from..]);
    }
    out.trim().to_string()
}

fn sanitize_pass(s: &str) -> String {
    remove_json_comments(trim_to_outer_json_object(strip_code_fences(s)))
}

/// Strip fences, trim to the outer object and drop comments until nothing changes
///
/// Each pass can expose new noise (a comment hiding a fence, a fence hiding a
/// comment), so the passes repeat to a fixpoint. Passes only shrink the text,
/// which bounds the loop and makes the result idempotent.
pub fn sanitize_json(raw: &str) -> String {
    debug!(raw_len = raw.len(), "sanitize_json: called");
    let mut current = raw.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// First `<plan` through the last `</plan>`, inclusive (case-insensitive)
pub fn extract_plan_span(raw: &str) -> Option<&str> {
    debug!(raw_len = raw.len(), "extract_plan_span: called");
    let lower = raw.to_ascii_lowercase();
    let start = lower.find(PLAN_OPEN)?;
    let end = lower.rfind(PLAN_CLOSE)?;
    if end < start {
        return None;
    }
    Some(&raw[start..end + PLAN_CLOSE.len()])
}
