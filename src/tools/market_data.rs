//! Compact market data tools
//!
//! Reshape quote, search, and historical payloads into the small tabular
//! replies the chat layer feeds to the LLM.

use super::unwrap::{unwrap_json, unwrap_list};
use super::{Agent, ToolReply, ToolSpec};
use crate::client::McpClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Real-time and historical market data utilities
pub struct MarketDataAgent {
    client: Arc<McpClient>,
}

impl MarketDataAgent {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }

    async fn search_instruments(&self, args: &Value) -> ToolReply {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        if query.is_empty() {
            return ToolReply::error("search_instruments needs a query");
        }
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(10)
            .max(1) as usize;

        let result = match self
            .client
            .call("search_instruments", json!({ "query": query }))
            .await
        {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let items = unwrap_list(&result);
        if items.is_empty() {
            return ToolReply::error(format!("no instruments found for '{}'", query));
        }

        let rows: Vec<Value> = items
            .iter()
            .take(limit)
            .map(|row| {
                json!({
                    "exchange": row.get("exchange"),
                    "symbol": row.get("tradingsymbol").or_else(|| row.get("name")),
                    "type": row.get("instrument_type"),
                    "token": row.get("instrument_token"),
                })
            })
            .collect();

        let mut lines = vec![format!(
            "instruments for '{}': {} match(es), showing {}",
            query,
            items.len(),
            rows.len()
        )];
        for row in &rows {
            lines.push(format!(
                "{:<4} {:<19} {:<4} {}",
                field_str(row, "exchange"),
                field_str(row, "symbol"),
                field_str(row, "type"),
                row.get("token").and_then(Value::as_u64).unwrap_or(0),
            ));
        }
        ToolReply::success(lines.join("\n"), Value::Array(rows))
    }

    async fn get_quotes(&self, args: &Value) -> ToolReply {
        let instruments: Vec<String> = args
            .get("instruments")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if instruments.is_empty() {
            return ToolReply::error("get_quotes needs a list of instruments");
        }

        let result = match self
            .client
            .call("get_quotes", json!({ "instruments": instruments }))
            .await
        {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let Some(Value::Object(quotes)) = unwrap_json(&result) else {
            return ToolReply::error("no quotes available");
        };

        let mut rows = Vec::new();
        let mut lines = Vec::new();
        for (instrument, quote) in &quotes {
            let last = quote
                .get("last_price")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let close = quote
                .get("ohlc")
                .and_then(|ohlc| ohlc.get("close"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let change = last - close;
            let pct = if close != 0.0 {
                change / close * 100.0
            } else {
                0.0
            };

            rows.push(json!({
                "instrument": instrument,
                "last_price": last,
                "net_change": change,
                "pct_change": pct,
                "ohlc": quote.get("ohlc"),
                "volume": quote.get("volume"),
            }));
            lines.push(format!(
                "{}: {:.2} ({:+.2}, {:+.2}%)",
                instrument, last, change, pct
            ));
        }

        if rows.is_empty() {
            return ToolReply::error("no quotes available");
        }
        ToolReply::success(lines.join("\n"), Value::Array(rows))
    }

    async fn get_historical_data(&self, args: &Value) -> ToolReply {
        let instrument = field_str(args, "instrument");
        if instrument.is_empty() {
            return ToolReply::error("get_historical_data needs an instrument");
        }
        let interval = args
            .get("interval")
            .and_then(Value::as_str)
            .unwrap_or("day")
            .to_string();
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(30)
            .max(1) as usize;

        let mut call_args = json!({ "instrument": instrument, "interval": interval });
        for key in ["from", "to", "instrument_token"] {
            if let Some(v) = args.get(key) {
                call_args[key] = v.clone();
            }
        }

        let result = match self.client.call("get_historical_data", call_args).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let candles = unwrap_list(&result);
        if candles.is_empty() {
            return ToolReply::error(format!("no historical data for {}", instrument));
        }

        let rows: Vec<Value> = candles
            .iter()
            .rev()
            .take(limit)
            .rev()
            .map(normalize_candle)
            .collect();

        let last_close = rows
            .last()
            .and_then(|row| row.get("close"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let message = format!(
            "{} {} candle(s) for {}, last close {:.2}",
            rows.len(),
            interval,
            instrument,
            last_close
        );
        ToolReply::success(message, Value::Array(rows))
    }
}

/// Candles arrive either as `[ts, open, high, low, close, volume]` arrays
/// or as keyed objects, depending on the server build.
fn normalize_candle(candle: &Value) -> Value {
    match candle {
        Value::Array(parts) => json!({
            "date": parts.first(),
            "open": parts.get(1),
            "high": parts.get(2),
            "low": parts.get(3),
            "close": parts.get(4),
            "volume": parts.get(5),
        }),
        Value::Object(map) => json!({
            "date": map.get("date").or_else(|| map.get("timestamp")),
            "open": map.get("open"),
            "high": map.get("high"),
            "low": map.get("low"),
            "close": map.get("close"),
            "volume": map.get("volume"),
        }),
        other => other.clone(),
    }
}

fn field_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl Agent for MarketDataAgent {
    fn name(&self) -> &'static str {
        "market_data"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "search_instruments".to_string(),
                description: "Search trading instruments and show the first few best matches."
                    .to_string(),
                parameters: json!({ "query": "str e.g. 'INFY'", "limit": "int (optional)" }),
            },
            ToolSpec {
                name: "get_quotes".to_string(),
                description: "Real-time quotes for one or more instruments.".to_string(),
                parameters: json!({ "instruments": "list[str] e.g. ['NSE:INFY']" }),
            },
            ToolSpec {
                name: "get_historical_data".to_string(),
                description: "Historical OHLC candles for a symbol or token.".to_string(),
                parameters: json!({
                    "instrument": "str e.g. 'NSE:INFY'",
                    "from": "YYYY-MM-DD (optional)",
                    "to": "YYYY-MM-DD (optional)",
                    "interval": "str, default 'day'",
                    "limit": "int rows, default 30"
                }),
            },
        ]
    }

    async fn run(&self, tool_name: &str, args: Value) -> ToolReply {
        match tool_name {
            "search_instruments" => self.search_instruments(&args).await,
            "get_quotes" => self.get_quotes(&args).await,
            "get_historical_data" => self.get_historical_data(&args).await,
            other => ToolReply::error(format!("unknown tool: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ReplyStatus;

    #[test]
    fn test_normalize_candle_array_form() {
        let candle = json!(["2024-01-02", 100.0, 110.0, 95.0, 105.0, 12345]);
        let row = normalize_candle(&candle);
        assert_eq!(row["close"], 105.0);
        assert_eq!(row["date"], "2024-01-02");
    }

    #[test]
    fn test_normalize_candle_object_form() {
        let candle = json!({ "timestamp": "2024-01-02", "open": 1.0, "close": 2.0 });
        let row = normalize_candle(&candle);
        assert_eq!(row["date"], "2024-01-02");
        assert_eq!(row["close"], 2.0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_reply() {
        use crate::client::transport::testing::ScriptedTransport;
        let client = Arc::new(McpClient::with_transport(
            Default::default(),
            ScriptedTransport::new([]),
        ));
        let agent = MarketDataAgent::new(client);

        let reply = agent.run("place_order", json!({})).await;
        assert_eq!(reply.status, ReplyStatus::Error);
        assert!(reply.message.contains("place_order"));
    }
}
