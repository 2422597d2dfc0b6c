//! Account tools
//!
//! Profile and margin lookups, flattened from the broker's nested payloads.

use super::unwrap::unwrap_json;
use super::{Agent, ToolReply, ToolSpec};
use crate::client::McpClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// User profile and margin information
pub struct AccountAgent {
    client: Arc<McpClient>,
}

impl AccountAgent {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }

    async fn get_profile(&self) -> ToolReply {
        let result = match self.client.call("get_profile", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let Some(profile) = unwrap_json(&result).filter(Value::is_object) else {
            return ToolReply::error("no profile data available");
        };

        let user_name = profile
            .get("user_name")
            .or_else(|| profile.get("user_shortname"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let row = json!({
            "user_id": profile.get("user_id"),
            "user_name": user_name,
            "email": profile.get("email"),
            "broker": profile.get("broker"),
            "user_type": profile.get("user_type"),
            "products": profile.get("products").cloned().unwrap_or(json!([])),
            "exchanges": profile.get("exchanges").cloned().unwrap_or(json!([])),
        });

        let message = format!(
            "{} ({}) @ {}",
            user_name,
            row.get("user_id").and_then(Value::as_str).unwrap_or("?"),
            row.get("broker").and_then(Value::as_str).unwrap_or("?"),
        );
        ToolReply::success(message, row)
    }

    async fn get_margins(&self) -> ToolReply {
        let result = match self.client.call("get_margins", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let Some(margins) = unwrap_json(&result).filter(Value::is_object) else {
            return ToolReply::error("no margin data available");
        };

        let equity = segment(&margins, "equity");
        let commodity = segment(&margins, "commodity");
        let total = num(&equity, "net") + num(&commodity, "net");

        let message = format!(
            "equity net {:.2} (cash {:.2}), commodity net {:.2}, total {:.2}",
            num(&equity, "net"),
            num(&equity, "available_cash"),
            num(&commodity, "net"),
            total,
        );
        ToolReply::success(
            message,
            json!({ "equity": equity, "commodity": commodity, "total_net": total }),
        )
    }
}

/// Flatten one margin segment; the broker nests the interesting numbers
/// under `available` and `utilised`.
fn segment(margins: &Value, key: &str) -> Value {
    let raw = margins.get(key).cloned().unwrap_or(Value::Null);
    json!({
        "net": num(&raw, "net"),
        "available_cash": nested(&raw, "available", "cash"),
        "available_margin": nested(&raw, "available", "live_balance"),
        "utilised": nested(&raw, "utilised", "debits"),
    })
}

fn num(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn nested(value: &Value, outer: &str, inner: &str) -> f64 {
    value
        .get(outer)
        .and_then(|v| v.get(inner))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

#[async_trait]
impl Agent for AccountAgent {
    fn name(&self) -> &'static str {
        "account"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_profile".to_string(),
                description: "Fetch user profile information.".to_string(),
                parameters: json!({}),
            },
            ToolSpec {
                name: "get_margins".to_string(),
                description: "Account margin details for equity and commodity.".to_string(),
                parameters: json!({}),
            },
        ]
    }

    async fn run(&self, tool_name: &str, _args: Value) -> ToolReply {
        match tool_name {
            "get_profile" => self.get_profile().await,
            "get_margins" => self.get_margins().await,
            other => ToolReply::error(format!("unknown tool: {}", other)),
        }
    }
}
