//! Retry, backoff, and timeout configuration

use super::env_parse;
use crate::client::errors::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ceiling on a single backoff sleep; the doubling schedule overflows
/// `Duration` for large retry budgets otherwise.
const MAX_BACKOFF_SECS: f64 = 60.0;

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_secs() -> f64 {
    1.0
}

/// Policy for retrying transient tool-call failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retry attempts after the initial call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff, in seconds
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: f64,
    /// Per-call deadline, in seconds. None means the remote call may block
    /// its owning task indefinitely.
    #[serde(default)]
    pub call_timeout_secs: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
            call_timeout_secs: None,
        }
    }
}

impl RetryConfig {
    /// Recognized environment variables: `MCP_MAX_RETRIES`,
    /// `MCP_RETRY_DELAY`, `MCP_CALL_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(retries) = env_parse::<u32>("MCP_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(delay) = env_parse::<f64>("MCP_RETRY_DELAY")? {
            config.base_delay_secs = delay;
        }
        config.call_timeout_secs = env_parse::<f64>("MCP_CALL_TIMEOUT_SECS")?;
        Ok(config)
    }

    /// Backoff delay for the given zero-based attempt: `base * 2^attempt`,
    /// capped at [`MAX_BACKOFF_SECS`]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = self.base_delay_secs * 2f64.powi(attempt.min(1023) as i32);
        Duration::from_secs_f64(secs.clamp(0.0, MAX_BACKOFF_SECS))
    }

    /// Per-call deadline as a [`Duration`], if configured
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_delay_secs < 0.0 {
            return Err(ClientError::Config(
                "retry.base_delay_secs must not be negative".to_string(),
            ));
        }
        if let Some(timeout) = self.call_timeout_secs {
            if timeout <= 0.0 {
                return Err(ClientError::Config(
                    "retry.call_timeout_secs must be positive when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_doubles() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_scales_with_base_delay() {
        let config = RetryConfig {
            base_delay_secs: 0.5,
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(2), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let config = RetryConfig {
            max_retries: 100,
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(6), Duration::from_secs(60));
        assert_eq!(config.backoff_delay(64), Duration::from_secs(60));
        assert_eq!(config.backoff_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_call_timeout_off_by_default() {
        assert!(RetryConfig::default().call_timeout().is_none());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = RetryConfig {
            call_timeout_secs: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
