//! Rate-limited, retrying MCP client
//!
//! [`McpClient`] owns the connection lifecycle, admits calls through the
//! sliding-window limiter, and retries transient failures with exponential
//! backoff. The transport seam is [`transport::ToolTransport`].

mod client;
pub mod errors;
mod login;
pub mod transport;

pub use client::McpClient;
pub use errors::{ClientError, Result, TransportError};
pub use login::{extract_login_url, run_login_flow};
