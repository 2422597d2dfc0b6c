//! # Kite MCP Client
//!
//! A rate-limited, retrying client for the Zerodha Kite MCP tool server,
//! plus the JSON-normalization agents the chat and report layers consume.
//!
//! The client speaks JSON-RPC over an SSE session, admits requests through a
//! sliding-window rate limiter, and retries transient failures (rate limits,
//! connection loss, timeouts) with exponential backoff and reconnection.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use kite_mcp_client::{Config, McpClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = McpClient::new(config)?;
//!
//!     let result = client
//!         .call("get_quotes", json!({ "instruments": ["NSE:INFY"] }))
//!         .await?;
//!     println!("{}", result.collect_text());
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod core;
pub mod tools;

// Re-export main types
pub use client::{ClientError, McpClient, Result, TransportError};
pub use client::{extract_login_url, run_login_flow};
pub use client::transport::{SseTransport, ToolTransport};
pub use config::{Config, RateLimitConfig, RetryConfig, TransportConfig};
pub use crate::core::rate_limiter::SlidingWindowLimiter;
pub use crate::core::types::{ContentBlock, ToolResult};
pub use tools::{
    Agent, AccountAgent, MarketDataAgent, OrdersAgent, PortfolioAgent, ReplyStatus, ToolReply,
    ToolSpec,
};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the client with default logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
