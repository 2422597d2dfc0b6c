//! Retrying client wrapper around a [`ToolTransport`]

use crate::client::errors::{ClientError, Result, TransportError};
use crate::client::transport::{SseTransport, ToolTransport};
use crate::config::Config;
use crate::core::rate_limiter::SlidingWindowLimiter;
use crate::core::types::ToolResult;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Disconnected,
    Connected,
}

/// MCP client with rate limiting, retry, and reconnection
///
/// One client owns one session. Construct one per logical session and pass
/// it explicitly through the call chain; there is no process-wide instance.
pub struct McpClient {
    transport: Arc<dyn ToolTransport>,
    limiter: SlidingWindowLimiter,
    config: Config,
    state: Mutex<ConnState>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl McpClient {
    /// Create a client speaking SSE to the configured endpoint
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(SseTransport::new(config.transport.clone())?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over an injected transport
    pub fn with_transport(config: Config, transport: Arc<dyn ToolTransport>) -> Self {
        let limiter = SlidingWindowLimiter::new(&config.rate_limit);
        Self {
            transport,
            limiter,
            config,
            state: Mutex::new(ConnState::Disconnected),
        }
    }

    /// Open the transport; no-op when already connected
    pub async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == ConnState::Connected {
            return Ok(());
        }
        self.transport.open().await?;
        *state = ConnState::Connected;
        debug!("mcp client connected");
        Ok(())
    }

    /// Tear the transport down; no-op when already disconnected
    ///
    /// Transport-level close failures are logged and swallowed; the state
    /// still resets so a later connect() starts fresh.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == ConnState::Disconnected {
            return Ok(());
        }
        if let Err(e) = self.transport.close().await {
            warn!("transport close failed: {}", e);
        }
        *state = ConnState::Disconnected;
        debug!("mcp client disconnected");
        Ok(())
    }

    /// Call a named remote tool
    ///
    /// Connects lazily, admits the call through the rate limiter, and
    /// retries transient failures with exponential backoff. Rate-limit
    /// failures back off in place; connection-class failures (including
    /// timeouts) reconnect first. Anything else propagates immediately.
    pub async fn call(&self, tool_name: &str, arguments: Value) -> Result<ToolResult> {
        self.connect().await?;

        let max_retries = self.config.retry.max_retries;
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..=max_retries {
            self.limiter.acquire().await;

            match self.call_once(tool_name, arguments.clone()).await {
                Ok(result) => return Ok(result),
                Err(TransportError::RateLimited(message)) => {
                    if attempt == max_retries {
                        error!("rate limit error after {max_retries} retries: {message}");
                        return Err(ClientError::RateLimitExceeded {
                            retries: max_retries,
                        });
                    }
                    let wait = self.config.retry.backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries,
                        wait_secs = wait.as_secs_f64(),
                        "rate limit hit, backing off"
                    );
                    last_error = Some(TransportError::RateLimited(message));
                    tokio::time::sleep(wait).await;
                }
                Err(e) if e.is_retryable() => {
                    if attempt == max_retries {
                        error!("connection error after {max_retries} retries: {e}");
                        return Err(e.into());
                    }
                    let wait = self.config.retry.backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries,
                        wait_secs = wait.as_secs_f64(),
                        "connection error, reconnecting: {e}"
                    );
                    last_error = Some(e);
                    // Best effort; the next attempt is authoritative.
                    if let Err(close_err) = self.close().await {
                        debug!("close during reconnect failed: {}", close_err);
                    }
                    if let Err(connect_err) = self.connect().await {
                        debug!("reconnect attempt failed: {}", connect_err);
                    }
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    error!("tool call failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        // The loop returns on its final attempt; keep the guard anyway.
        Err(last_error.map(ClientError::from).unwrap_or_else(|| {
            ClientError::Transport(TransportError::Other("retry budget exhausted".to_string()))
        }))
    }

    async fn call_once(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> std::result::Result<ToolResult, TransportError> {
        let call = self.transport.call_tool(tool_name, arguments);
        match self.config.retry.call_timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(format!(
                    "tool call exceeded {}s",
                    limit.as_secs_f64()
                ))),
            },
            None => call.await,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
