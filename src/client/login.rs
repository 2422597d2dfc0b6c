//! Login URL extraction
//!
//! The login tool returns its redirect URL in whatever slot the server
//! happens to use: prose text, `structured_content`, or `data`. The scan
//! here is deliberately forgiving.

use crate::client::McpClient;
use crate::client::errors::{ClientError, Result};
use crate::core::types::ToolResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{info, warn};

/// Exchange-branded URLs take priority over any other link in the payload.
static KITE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://[^\s)]*kite\.[^\s)]+").unwrap());

static GENERIC_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://[^\s)]+").unwrap());

fn find_url(text: &str) -> Option<String> {
    KITE_URL_RE
        .find(text)
        .or_else(|| GENERIC_URL_RE.find(text))
        .map(|m| m.as_str().to_string())
}

fn find_url_in_value(payload: &Value) -> Option<String> {
    match payload {
        Value::Object(map) => {
            // Known key names first, then any string-shaped value.
            for key in ["login_url", "url", "href"] {
                if let Some(Value::String(v)) = map.get(key) {
                    if v.starts_with("http") {
                        return Some(v.clone());
                    }
                }
            }
            map.values().find_map(|v| match v {
                Value::String(s) => find_url(s),
                Value::Object(_) | Value::Array(_) => find_url_in_value(v),
                _ => None,
            })
        }
        Value::Array(items) => items.iter().find_map(find_url_in_value),
        Value::String(s) => find_url(s),
        _ => None,
    }
}

/// Best-effort scan of a login tool response for an authentication URL
///
/// Tries the collected text first (exchange pattern, then a generic URL
/// pattern), then the structured payloads. Returns None when nothing
/// URL-shaped is present.
pub fn extract_login_url(result: &ToolResult) -> Option<String> {
    let raw_text = result.collect_text();
    if !raw_text.is_empty() {
        if let Some(url) = find_url(&raw_text) {
            return Some(url);
        }
    }

    [&result.structured_content, &result.data]
        .into_iter()
        .flatten()
        .find_map(find_url_in_value)
}

/// Invoke the remote `login` tool and return the URL the user must visit
pub async fn run_login_flow(client: &McpClient) -> Result<String> {
    let result = client.call("login", json!({})).await?;

    match extract_login_url(&result) {
        Some(url) => {
            info!("login url: {}", url);
            Ok(url)
        }
        None => {
            let raw = result.collect_text();
            if !raw.is_empty() {
                warn!("login tool output without url: {}", raw);
            }
            Err(ClientError::LoginUrl(
                "no url-shaped token in login tool response".to_string(),
            ))
        }
    }
}
