//! JSON-normalization agents layered over the client
//!
//! Each agent owns a small catalog of chat-friendly tools and reshapes raw
//! MCP payloads into a stable `{status, message, data}` reply for downstream
//! LLM prompting. Remote failures fold into an error reply rather than
//! propagating, so the chat loop never has to unwind.

pub mod account;
pub mod market_data;
pub mod orders;
pub mod portfolio;
pub mod unwrap;

pub use account::AccountAgent;
pub use market_data::MarketDataAgent;
pub use orders::OrdersAgent;
pub use portfolio::PortfolioAgent;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog entry describing one tool an agent exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, as dispatched to [`Agent::run`]
    pub name: String,
    /// One-line description for the router prompt
    pub description: String,
    /// Parameter hints, as loose JSON
    pub parameters: Value,
}

/// Reply status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Stable reply shape handed to the LLM layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReply {
    pub status: ReplyStatus,
    /// Compact human-readable rendering of the payload
    pub message: String,
    /// Normalized rows
    pub data: Value,
}

impl ToolReply {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: message.into(),
            data: Value::Array(Vec::new()),
        }
    }
}

/// A single-responsibility agent the chat orchestrator dispatches to
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable agent name used in routing plans
    fn name(&self) -> &'static str;

    /// Tool catalog this agent answers for
    fn tools(&self) -> Vec<ToolSpec>;

    /// Run one tool; unknown names yield an error reply, never a panic
    async fn run(&self, tool_name: &str, args: Value) -> ToolReply;
}
