//! Portfolio tools
//!
//! Holdings, positions, and mutual funds, condensed to the totals a chat
//! answer needs.

use super::unwrap::{unwrap_json, unwrap_list};
use super::{Agent, ToolReply, ToolSpec};
use crate::client::McpClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Holdings and positions summaries
pub struct PortfolioAgent {
    client: Arc<McpClient>,
}

impl PortfolioAgent {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }

    async fn get_holdings(&self) -> ToolReply {
        let result = match self.client.call("get_holdings", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let holdings = unwrap_list(&result);
        if holdings.is_empty() {
            return ToolReply::error("no holdings found");
        }

        let mut rows = Vec::new();
        let mut invested_total = 0.0;
        let mut current_total = 0.0;
        for holding in &holdings {
            let quantity = num(holding, "quantity");
            let average = num(holding, "average_price");
            let last = num(holding, "last_price");
            let invested = quantity * average;
            let current = quantity * last;
            invested_total += invested;
            current_total += current;

            rows.push(json!({
                "symbol": holding.get("tradingsymbol"),
                "quantity": quantity,
                "average_price": average,
                "last_price": last,
                "invested": invested,
                "current": current,
                "pnl": current - invested,
            }));
        }

        let pnl_total = current_total - invested_total;
        let pct = if invested_total != 0.0 {
            pnl_total / invested_total * 100.0
        } else {
            0.0
        };
        let message = format!(
            "{} holding(s): invested {:.2}, current {:.2}, P&L {:+.2} ({:+.2}%)",
            rows.len(),
            invested_total,
            current_total,
            pnl_total,
            pct
        );
        ToolReply::success(message, Value::Array(rows))
    }

    async fn get_positions(&self) -> ToolReply {
        let result = match self.client.call("get_positions", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        // The payload is either a bare list or a {net, day} pair.
        let positions = match unwrap_json(&result) {
            Some(Value::Object(map)) => match map.get("net") {
                Some(Value::Array(net)) => net.clone(),
                _ => Vec::new(),
            },
            Some(Value::Array(list)) => list,
            _ => unwrap_list(&result),
        };
        if positions.is_empty() {
            return ToolReply::error("no open positions");
        }

        let mut rows = Vec::new();
        let mut pnl_total = 0.0;
        let mut lines = Vec::new();
        for position in &positions {
            let pnl = num(position, "pnl");
            pnl_total += pnl;

            let symbol = position
                .get("tradingsymbol")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            let quantity = num(position, "quantity");
            lines.push(format!("{}: qty {:.0}, P&L {:+.2}", symbol, quantity, pnl));

            rows.push(json!({
                "symbol": symbol,
                "quantity": quantity,
                "average_price": num(position, "average_price"),
                "last_price": num(position, "last_price"),
                "pnl": pnl,
                "realized": num(position, "realised"),
                "unrealized": num(position, "unrealised"),
            }));
        }

        let message = format!(
            "{} net position(s), total P&L {:+.2}\n{}",
            rows.len(),
            pnl_total,
            lines.join("\n")
        );
        ToolReply::success(message, Value::Array(rows))
    }

    async fn get_mf_holdings(&self) -> ToolReply {
        let result = match self.client.call("get_mf_holdings", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let schemes = unwrap_list(&result);
        if schemes.is_empty() {
            return ToolReply::error("no mutual fund holdings found");
        }

        let mut rows = Vec::new();
        let mut invested_total = 0.0;
        let mut current_total = 0.0;
        for scheme in &schemes {
            // MF payloads reuse the equity field names: quantity is units,
            // the price fields are NAVs.
            let units = num(scheme, "quantity");
            let average_nav = num(scheme, "average_price");
            let current_nav = num(scheme, "last_price");
            let investment_value = units * average_nav;
            let current_value = units * current_nav;
            let pnl = current_value - investment_value;
            invested_total += investment_value;
            current_total += current_value;

            rows.push(json!({
                "scheme_name": scheme.get("fund"),
                "units": units,
                "average_nav": average_nav,
                "current_nav": current_nav,
                "investment_value": investment_value,
                "current_value": current_value,
                "pnl": pnl,
                "pnl_percentage": if investment_value != 0.0 {
                    pnl / investment_value * 100.0
                } else {
                    0.0
                },
            }));
        }

        let pnl_total = current_total - invested_total;
        let pct = if invested_total != 0.0 {
            pnl_total / invested_total * 100.0
        } else {
            0.0
        };
        let message = format!(
            "{} scheme(s): invested {:.2}, current {:.2}, P&L {:+.2} ({:+.2}%)",
            rows.len(),
            invested_total,
            current_total,
            pnl_total,
            pct
        );
        ToolReply::success(message, Value::Array(rows))
    }
}

fn num(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

#[async_trait]
impl Agent for PortfolioAgent {
    fn name(&self) -> &'static str {
        "portfolio"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_holdings".to_string(),
                description: "Long-term holdings with invested/current value and P&L totals."
                    .to_string(),
                parameters: json!({}),
            },
            ToolSpec {
                name: "get_positions".to_string(),
                description: "Open net positions with realized/unrealized P&L.".to_string(),
                parameters: json!({}),
            },
            ToolSpec {
                name: "get_mf_holdings".to_string(),
                description: "Mutual fund holdings with NAV-based value and P&L totals."
                    .to_string(),
                parameters: json!({}),
            },
        ]
    }

    async fn run(&self, tool_name: &str, _args: Value) -> ToolReply {
        match tool_name {
            "get_holdings" => self.get_holdings().await,
            "get_positions" => self.get_positions().await,
            "get_mf_holdings" => self.get_mf_holdings().await,
            other => ToolReply::error(format!("unknown tool: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_missing_key_is_zero() {
        assert_eq!(num(&json!({}), "pnl"), 0.0);
        assert_eq!(num(&json!({ "pnl": 12.5 }), "pnl"), 12.5);
    }
}
