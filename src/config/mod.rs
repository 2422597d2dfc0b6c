//! Configuration management for the MCP client
//!
//! All options are recognized from environment variables (with `.env`
//! support through `dotenvy`), or can be filled in programmatically.

mod rate_limit;
mod retry;
mod transport;

pub use rate_limit::RateLimitConfig;
pub use retry::RetryConfig;
pub use transport::TransportConfig;

use crate::client::errors::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

/// Top-level configuration for [`McpClient`](crate::client::McpClient)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SSE endpoint and headers
    pub transport: TransportConfig,
    /// Outbound request-rate ceiling
    pub rate_limit: RateLimitConfig,
    /// Retry, backoff, and timeout policy
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        info!("loading MCP client configuration from environment");

        let config = Self {
            transport: TransportConfig::from_env(),
            rate_limit: RateLimitConfig::from_env()?,
            retry: RetryConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        self.rate_limit.validate()?;
        self.retry.validate()?;
        debug!("configuration validated");
        Ok(())
    }
}

/// Parse an optional environment variable, surfacing malformed values
/// instead of silently falling back to the default.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("invalid value for {}: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_deserialization_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.transport.url, "https://mcp.kite.trade/sse");
        assert!(config.retry.call_timeout_secs.is_none());
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        // SAFETY: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("KITE_MCP_TEST_GARBAGE", "not-a-number") };
        let result = env_parse::<u32>("KITE_MCP_TEST_GARBAGE");
        assert!(result.is_err());
        unsafe { std::env::remove_var("KITE_MCP_TEST_GARBAGE") };
    }
}
