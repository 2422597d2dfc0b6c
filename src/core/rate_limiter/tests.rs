//! Tests for the sliding-window limiter

use super::SlidingWindowLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn admits_within_limit_without_delay() {
    let limiter = SlidingWindowLimiter::with_limits(3, Duration::from_secs(1));

    let start = Instant::now();
    for _ in 0..3 {
        limiter.acquire().await;
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn delays_calls_over_limit() {
    let limiter = SlidingWindowLimiter::with_limits(3, Duration::from_secs(1));

    let start = Instant::now();
    for _ in 0..5 {
        limiter.acquire().await;
    }
    // Calls 4 and 5 cannot be admitted before the first window rolls past.
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn delays_by_window_remainder() {
    let limiter = SlidingWindowLimiter::with_limits(3, Duration::from_secs(1));
    for _ in 0..3 {
        limiter.acquire().await;
    }

    tokio::time::advance(Duration::from_millis(400)).await;

    // Window opened 400ms ago, so the fourth call waits out the remainder.
    let start = Instant::now();
    limiter.acquire().await;
    assert_eq!(start.elapsed(), Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn concurrent_acquires_respect_window() {
    let limiter = Arc::new(SlidingWindowLimiter::with_limits(2, Duration::from_secs(1)));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.acquire().await;
            Instant::now()
        }));
    }

    let mut admissions = Vec::new();
    for handle in handles {
        admissions.push(handle.await.unwrap());
    }
    admissions.sort();

    // With a limit of 2, admissions i and i+2 must be at least a window apart.
    for pair in admissions.windows(3) {
        assert!(pair[2].duration_since(pair[0]) >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn window_frees_up_after_expiry() {
    let limiter = SlidingWindowLimiter::with_limits(2, Duration::from_millis(100));
    limiter.acquire().await;
    limiter.acquire().await;

    tokio::time::advance(Duration::from_millis(150)).await;

    let start = Instant::now();
    limiter.acquire().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}
