//! Pulling a JSON object out of a model reply.
//!
//! Models asked for JSON still wrap it in markdown fences or a sentence of
//! prose often enough that a bare `serde_json::from_str` is not sufficient.

use serde_json::Value;

/// Returns the JSON object contained in `text`, if any.
///
/// Accepts, in order: the whole reply as a JSON object, the contents of the
/// first fenced code block, or the span from the first `{` to the last `}`.
/// Non-object JSON (arrays, scalars) yields `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(v) = parse_object(trimmed) {
        return Some(v);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Some(v) = parse_object(inner) {
            return Some(v);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&trimmed[start..=end])
}

fn parse_object(s: &str) -> Option<Value> {
    serde_json::from_str::<Value>(s.trim()).ok().filter(Value::is_object)
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Skip the info string ("json", "JSON", …) up to the end of the line.
    let body_start = after_ticks.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}
