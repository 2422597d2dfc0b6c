//! Core limiter implementation

use crate::config::RateLimitConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Sliding-window rate limiter
///
/// Tracks admission timestamps for the current window. The prune-and-append
/// sequence runs under a single lock so admission counting stays race-free
/// when cooperative tasks call [`acquire`](Self::acquire) concurrently.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<Vec<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(config.max_requests, config.window())
    }

    /// Create a limiter with explicit limits
    pub fn with_limits(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1) as usize,
            window,
            timestamps: Mutex::new(Vec::new()),
        }
    }

    /// Wait until a request can be admitted without exceeding the limit.
    ///
    /// Cannot fail, only delay. On return the caller is within the
    /// configured rate: at most `max_requests` admissions fall inside any
    /// window-wide interval.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().await;
                let now = Instant::now();
                timestamps.retain(|&t| now.duration_since(t) < self.window);

                if timestamps.len() < self.max_requests {
                    timestamps.push(now);
                    return;
                }

                // The oldest entry decides when the next slot frees up.
                self.window - now.duration_since(timestamps[0])
            };

            if wait > Duration::ZERO {
                debug!(wait_secs = wait.as_secs_f64(), "rate limit reached, waiting");
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Configured ceiling per window
    pub fn limit(&self) -> usize {
        self.max_requests
    }

    /// Configured window width
    pub fn window(&self) -> Duration {
        self.window
    }
}
