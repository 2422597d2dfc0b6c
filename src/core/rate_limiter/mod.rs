//! Sliding-window rate limiting for outbound tool calls
//!
//! Admits at most N calls per rolling window, suspending excess callers
//! rather than rejecting them.

mod limiter;

#[cfg(test)]
mod tests;

pub use limiter::SlidingWindowLimiter;
