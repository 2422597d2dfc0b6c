//! Shared unwrappers for heterogeneous MCP payloads
//!
//! Servers answer the same tool through different slots: a structured
//! payload, a legacy `data` field, or JSON embedded in the text content,
//! sometimes wrapped in one more `data`/`result` envelope.

use crate::core::types::ToolResult;
use serde_json::Value;

/// Pull the most structured JSON payload out of a tool result
pub fn unwrap_json(result: &ToolResult) -> Option<Value> {
    if let Some(v) = &result.structured_content {
        return Some(strip_envelope(v.clone()));
    }
    if let Some(v) = &result.data {
        return Some(strip_envelope(v.clone()));
    }
    let text = result.collect_text();
    if text.is_empty() {
        return None;
    }
    serde_json::from_str(&text).ok().map(strip_envelope)
}

/// Like [`unwrap_json`], flattened to a list of rows
pub fn unwrap_list(result: &ToolResult) -> Vec<Value> {
    match unwrap_json(result) {
        Some(Value::Array(items)) => items,
        Some(other) if other.is_object() => vec![other],
        _ => Vec::new(),
    }
}

/// Unwrap one `data`/`result` envelope level, when that is clearly all
/// the object is: the payload plus at most a status-style sibling.
fn strip_envelope(value: Value) -> Value {
    if let Value::Object(map) = &value {
        for key in ["data", "result"] {
            if let Some(inner) = map.get(key) {
                if map.len() <= 2 && (inner.is_array() || inner.is_object()) {
                    return inner.clone();
                }
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_structured_content() {
        let result = ToolResult {
            structured_content: Some(json!([{ "a": 1 }])),
            data: Some(json!([{ "b": 2 }])),
            ..ToolResult::text("[{\"c\": 3}]")
        };
        assert_eq!(unwrap_json(&result), Some(json!([{ "a": 1 }])));
    }

    #[test]
    fn test_parses_json_from_text() {
        let result = ToolResult::text(r#"{"data": [{"symbol": "INFY"}]}"#);
        assert_eq!(unwrap_json(&result), Some(json!([{ "symbol": "INFY" }])));
    }

    #[test]
    fn test_keeps_rich_objects_intact() {
        let payload = json!({ "data": [1], "status": "ok", "meta": {} });
        let result = ToolResult {
            structured_content: Some(payload.clone()),
            ..Default::default()
        };
        // Three keys: not a bare envelope, leave it alone.
        assert_eq!(unwrap_json(&result), Some(payload));
    }

    #[test]
    fn test_unwrap_list_wraps_single_object() {
        let result = ToolResult {
            structured_content: Some(json!({ "symbol": "INFY", "last_price": 1500.0 })),
            ..Default::default()
        };
        let list = unwrap_list(&result);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_unwrap_list_empty_for_prose() {
        let result = ToolResult::text("no structured payload here");
        assert!(unwrap_list(&result).is_empty());
        assert!(unwrap_json(&result).is_none());
    }
}
