//! Order and trade tools
//!
//! Read-only order book queries, normalized to stable rows with a status
//! breakdown the chat layer can summarize directly.

use super::unwrap::unwrap_list;
use super::{Agent, ToolReply, ToolSpec};
use crate::client::McpClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Read-only order, trade, and order-history queries
pub struct OrdersAgent {
    client: Arc<McpClient>,
}

impl OrdersAgent {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }

    async fn get_orders(&self) -> ToolReply {
        let result = match self.client.call("get_orders", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let orders = unwrap_list(&result);
        if orders.is_empty() {
            return ToolReply::error("no orders found");
        }

        let rows: Vec<Value> = orders.iter().map(normalize_order).collect();
        let breakdown = status_breakdown(&rows);
        let message = format!(
            "{} order(s): {} complete, {} rejected, {} cancelled, {} open",
            rows.len(),
            breakdown.complete,
            breakdown.rejected,
            breakdown.cancelled,
            breakdown.open
        );
        ToolReply::success(message, Value::Array(rows))
    }

    async fn get_trades(&self) -> ToolReply {
        let result = match self.client.call("get_trades", json!({})).await {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let trades = unwrap_list(&result);
        if trades.is_empty() {
            return ToolReply::error("no trades found");
        }

        let rows: Vec<Value> = trades.iter().map(normalize_trade).collect();
        let total_quantity: f64 = rows
            .iter()
            .map(|row| row.get("quantity").and_then(Value::as_f64).unwrap_or(0.0))
            .sum();
        let message = format!(
            "{} trade(s), total quantity {:.0}",
            rows.len(),
            total_quantity
        );
        ToolReply::success(message, Value::Array(rows))
    }

    async fn get_order_history(&self, args: &Value) -> ToolReply {
        let order_id = args
            .get("order_id")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();

        // Without an order id, surface the failed orders instead; that is
        // what the question behind this tool usually is.
        if order_id.is_empty() {
            return self.failed_orders().await;
        }

        let result = match self
            .client
            .call("get_order_history", json!({ "order_id": order_id }))
            .await
        {
            Ok(result) => result,
            Err(e) => return ToolReply::error(e.to_string()),
        };

        let events = unwrap_list(&result);
        if events.is_empty() {
            return ToolReply::error(format!("no history for order {}", order_id));
        }

        let rows: Vec<Value> = events
            .iter()
            .map(|event| {
                json!({
                    "timestamp": event.get("timestamp"),
                    "status": event.get("status"),
                    "message": event
                        .get("message")
                        .or_else(|| event.get("text"))
                        .and_then(Value::as_str)
                        .unwrap_or(""),
                })
            })
            .collect();
        let message = format!("{} event(s) for order {}", rows.len(), order_id);
        ToolReply::success(message, Value::Array(rows))
    }

    async fn failed_orders(&self) -> ToolReply {
        let orders = self.get_orders().await;
        if orders.status == super::ReplyStatus::Error {
            return orders;
        }

        let failed: Vec<Value> = orders
            .data
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        let status = field_upper(row, "status");
                        status.contains("REJECT") || status.contains("CANCEL")
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if failed.is_empty() {
            return ToolReply::success("no rejected or cancelled orders", json!([]));
        }

        let lines: Vec<String> = failed
            .iter()
            .map(|row| {
                format!(
                    "{} {}: {}",
                    field_str(row, "symbol"),
                    field_str(row, "status"),
                    field_str(row, "rejection_reason"),
                )
            })
            .collect();
        let message = format!("{} failed order(s)\n{}", failed.len(), lines.join("\n"));
        ToolReply::success(message, Value::Array(failed))
    }
}

fn normalize_order(order: &Value) -> Value {
    let quantity = num(order, "quantity");
    let filled = num(order, "filled_quantity");
    json!({
        "order_id": order.get("order_id"),
        "symbol": order.get("tradingsymbol"),
        "exchange": order.get("exchange"),
        "transaction_type": order.get("transaction_type"),
        "product": order.get("product"),
        "quantity": quantity,
        "filled_quantity": filled,
        "pending_quantity": quantity - filled,
        "average_price": num(order, "average_price"),
        "status": order.get("status"),
        "order_timestamp": order.get("order_timestamp"),
        "rejection_reason": order
            .get("rejection_reason")
            .and_then(Value::as_str)
            .unwrap_or(""),
    })
}

fn normalize_trade(trade: &Value) -> Value {
    json!({
        "trade_id": trade.get("trade_id"),
        "order_id": trade.get("order_id"),
        "symbol": trade.get("tradingsymbol"),
        "exchange": trade.get("exchange"),
        "transaction_type": trade.get("transaction_type"),
        "product": trade.get("product"),
        "quantity": num(trade, "quantity"),
        "price": num(trade, "price"),
        "trade_timestamp": trade.get("trade_timestamp"),
    })
}

#[derive(Default)]
struct StatusBreakdown {
    complete: usize,
    rejected: usize,
    cancelled: usize,
    open: usize,
}

fn status_breakdown(rows: &[Value]) -> StatusBreakdown {
    let mut breakdown = StatusBreakdown::default();
    for row in rows {
        let status = field_upper(row, "status");
        if status.contains("COMPLE") {
            breakdown.complete += 1;
        } else if status.contains("REJECT") {
            breakdown.rejected += 1;
        } else if status.contains("CANCEL") {
            breakdown.cancelled += 1;
        } else if status.contains("OPEN") {
            breakdown.open += 1;
        }
    }
    breakdown
}

fn num(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn field_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn field_upper(value: &Value, key: &str) -> String {
    field_str(value, key).to_uppercase()
}

#[async_trait]
impl Agent for OrdersAgent {
    fn name(&self) -> &'static str {
        "orders"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_orders".to_string(),
                description: "List all orders with a status breakdown.".to_string(),
                parameters: json!({}),
            },
            ToolSpec {
                name: "get_trades".to_string(),
                description: "List all executed trades with quantity totals.".to_string(),
                parameters: json!({}),
            },
            ToolSpec {
                name: "get_order_history".to_string(),
                description:
                    "Timeline for one order, or the rejected/cancelled orders when no id is given."
                        .to_string(),
                parameters: json!({ "order_id": "str (optional)" }),
            },
        ]
    }

    async fn run(&self, tool_name: &str, args: Value) -> ToolReply {
        match tool_name {
            "get_orders" => self.get_orders().await,
            "get_trades" => self.get_trades().await,
            "get_order_history" => self.get_order_history(&args).await,
            other => ToolReply::error(format!("unknown tool: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_order_derives_pending_quantity() {
        let row = normalize_order(&json!({
            "order_id": "1", "tradingsymbol": "INFY", "quantity": 10,
            "filled_quantity": 4, "status": "OPEN"
        }));
        assert_eq!(row["pending_quantity"], 6.0);
        assert_eq!(row["rejection_reason"], "");
    }

    #[test]
    fn test_status_breakdown_counts_by_substring() {
        let rows = vec![
            json!({ "status": "COMPLETE" }),
            json!({ "status": "REJECTED" }),
            json!({ "status": "CANCELLED AMO" }),
            json!({ "status": "OPEN" }),
            json!({ "status": "TRIGGER PENDING" }),
        ];
        let breakdown = status_breakdown(&rows);
        assert_eq!(breakdown.complete, 1);
        assert_eq!(breakdown.rejected, 1);
        assert_eq!(breakdown.cancelled, 1);
        assert_eq!(breakdown.open, 1);
    }
}
