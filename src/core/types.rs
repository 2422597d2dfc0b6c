//! Typed result envelope for MCP tool calls

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One content part of a tool result, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text part
    Text {
        /// The text payload
        text: String,
    },
    /// Non-text parts (images, resources); carried through but unused here
    #[serde(other)]
    Unsupported,
}

/// Structured envelope returned by a remote tool call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolResult {
    /// Typed content parts
    pub content: Vec<ContentBlock>,
    /// Machine-readable payload, when the server provides one
    pub structured_content: Option<Value>,
    /// Legacy payload slot some servers fill instead
    pub data: Option<Value>,
    /// Whether the tool itself reported failure
    pub is_error: bool,
}

impl ToolResult {
    /// Build a plain-text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            ..Default::default()
        }
    }

    /// Concatenate all plain-text parts, trimmed
    pub fn collect_text(&self) -> String {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();
        texts.join("\n").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_wire_shape() {
        let raw = json!({
            "content": [
                { "type": "text", "text": "hello" },
                { "type": "image", "data": "...", "mimeType": "image/png" }
            ],
            "structuredContent": { "ok": true },
            "isError": false
        });

        let result: ToolResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.content.len(), 2);
        assert!(!result.is_error);
        assert_eq!(result.structured_content, Some(json!({ "ok": true })));
    }

    #[test]
    fn test_collect_text_skips_non_text_parts() {
        let raw = json!({
            "content": [
                { "type": "text", "text": "  first" },
                { "type": "image", "data": "x" },
                { "type": "text", "text": "second  " }
            ]
        });

        let result: ToolResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.collect_text(), "first\nsecond");
    }

    #[test]
    fn test_collect_text_empty_envelope() {
        assert_eq!(ToolResult::default().collect_text(), "");
    }
}
