// Recover a JSON object from noisy model output: fenced blocks, leading prose,
// stray control characters, trailing garbage after the object closes.

use serde_json::Value;

use super::types::ParsedObject;

/// Maximum number of `{` / `[` start positions tried during embedded recovery.
const MAX_CANDIDATES: usize = 50;

/// Pass-through entry point for callers that may already hold structured data.
///
/// An object is returned unchanged, a string goes through [`extract_json_object`],
/// anything else is rejected.
pub fn extract_from_value(value: &Value) -> Option<ParsedObject> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => extract_json_object(text),
        _ => None,
    }
}

/// Locate the first complete JSON object in `raw`.
///
/// Returns `None` when no object can be recovered. Text that parses in full
/// as an array or scalar is rejected outright; only unparseable text falls
/// through to the embedded scan.
pub fn extract_json_object(raw: &str) -> Option<ParsedObject> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(&unfenced) {
        return into_object(value);
    }

    let scrubbed = scrub_control_chars(&unfenced);
    if let Ok(value) = serde_json::from_str::<Value>(&scrubbed) {
        return into_object(value);
    }

    scan_embedded_object(&scrubbed)
}

/// Drop a leading fence line (optionally language-tagged) and a trailing fence line.
///
/// Text that does not start with a fence is returned trimmed but otherwise as-is.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !is_fence_line(trimmed) {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines.first().is_some_and(|l| is_fence_line(l.trim())) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| is_fence_line(l.trim())) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

fn is_fence_line(line: &str) -> bool {
    line.starts_with("```") || line.starts_with("~~~")
}

fn into_object(value: Value) -> Option<ParsedObject> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Replace C0 control characters and DEL with a space.
fn scrub_control_chars(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) <= 0x1F || c == '\u{7F}' { ' ' } else { c })
        .collect()
}

/// Try a one-value streaming parse at each `{` / `[` position, left to right.
///
/// Trailing text after a parsed value is ignored. Every position is tried, so
/// an object nested inside an array that follows prose is still found.
fn scan_embedded_object(text: &str) -> Option<ParsedObject> {
    let mut attempts = 0;

    for (pos, ch) in text.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        if attempts >= MAX_CANDIDATES {
            break;
        }
        attempts += 1;

        let mut stream = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            return Some(map);
        }
    }

    tracing::debug!(attempts, "No embedded JSON object recovered");
    None
}
