//! Error taxonomy for the MCP client
//!
//! Failures are classified into a small closed set of variants at the
//! transport boundary, so the retry loop matches on structure instead of
//! inspecting stringified error messages.

use thiserror::Error;

/// Errors raised by a [`ToolTransport`](crate::client::transport::ToolTransport)
#[derive(Error, Debug)]
pub enum TransportError {
    /// Server-side throttling (HTTP 429 class)
    #[error("rate limited by server: {0}")]
    RateLimited(String),

    /// The session or underlying connection is gone
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The configured per-call deadline elapsed
    #[error("call timed out: {0}")]
    Timeout(String),

    /// JSON-RPC error reported by the server
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Server-provided message
        message: String,
    },

    /// Anything else; never retried
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether the failure class is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::ConnectionLost(_) | Self::Timeout(_)
        )
    }
}

/// Errors surfaced by [`McpClient`](crate::client::McpClient)
#[derive(Error, Debug)]
pub enum ClientError {
    /// All retry attempts for a rate-limited call were exhausted
    #[error("rate limit exceeded after {retries} retries, please try again later")]
    RateLimitExceeded {
        /// The exhausted retry budget
        retries: u32,
    },

    /// Transport failure, re-raised unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No URL-shaped token found in a login tool response
    #[error("could not extract login url: {0}")]
    LoginUrl(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction/plumbing error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
