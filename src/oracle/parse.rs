//! Lenient readers for Oracle replies
//!
//! Models wrap JSON in code fences, prefix it with prose or trail it with
//! commentary. These helpers take the outermost object or array and give up
//! quietly (`None`) on anything else.

use serde_json::{Map, Value};

/// Strip a surrounding Markdown code fence, if any
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn outermost<'a>(raw: &'a str, open: char, close: char) -> Option<&'a str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse the outermost JSON object of a reply
#[must_use]
pub fn parse_json_object(raw: &str) -> Option<Map<String, Value>> {
    let body = strip_code_fences(raw);
    if let Ok(Value::Object(map)) = serde_json::from_str(body) {
        return Some(map);
    }
    match serde_json::from_str(outermost(body, '{', '}')?) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse the outermost JSON array of a reply
///
/// An object wrapping a single array (`{"items": [...]}`) is unwrapped.
#[must_use]
pub fn parse_json_array(raw: &str) -> Option<Vec<Value>> {
    let body = strip_code_fences(raw);
    match serde_json::from_str(body) {
        Ok(Value::Array(items)) => return Some(items),
        Ok(Value::Object(map)) => {
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            if let (Some(items), None) = (arrays.next(), arrays.next()) {
                return Some(items);
            }
        }
        _ => {}
    }
    match serde_json::from_str(outermost(body, '[', ']')?) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}
