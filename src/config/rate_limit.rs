//! Rate limiting configuration

use super::env_parse;
use crate::client::errors::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> f64 {
    1.0
}

/// Ceiling on outbound tool calls per rolling window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Width of the rolling window, in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Recognized environment variable: `MCP_MAX_REQUESTS_PER_SECOND`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(max) = env_parse::<u32>("MCP_MAX_REQUESTS_PER_SECOND")? {
            config.max_requests = max;
        }
        Ok(config)
    }

    /// Window width as a [`Duration`]
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(ClientError::Config(
                "rate_limit.max_requests must be positive".to_string(),
            ));
        }
        if self.window_secs <= 0.0 {
            return Err(ClientError::Config(
                "rate_limit.window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
