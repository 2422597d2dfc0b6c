//! Client retry, backoff, and lifecycle behavior

use kite_mcp_client::client::transport::testing::{ScriptedTransport, Step};
use kite_mcp_client::{ClientError, Config, McpClient, ToolResult, TransportError};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

fn test_config() -> Config {
    // Generous rate limit so only the backoff sleeps show up in timings.
    let mut config = Config::default();
    config.rate_limit.max_requests = 100;
    config
}

#[tokio::test(start_paused = true)]
async fn rate_limit_exhausts_retries_with_exponential_backoff() {
    let transport = ScriptedTransport::new([
        Step::RateLimited,
        Step::RateLimited,
        Step::RateLimited,
        Step::RateLimited,
    ]);
    let client = McpClient::with_transport(test_config(), transport.clone());

    let started = Instant::now();
    let err = client.call("get_quotes", json!({})).await.unwrap_err();

    // 1 initial + 3 retries, sleeping 1s, 2s, 4s between attempts.
    assert!(matches!(err, ClientError::RateLimitExceeded { retries: 3 }));
    assert_eq!(transport.calls(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    // Rate limiting never triggers a reconnect cycle.
    assert_eq!(transport.closes(), 0);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_propagates_without_sleeping() {
    let transport = ScriptedTransport::new([Step::Other("bad argument".to_string())]);
    let client = McpClient::with_transport(test_config(), transport.clone());

    let started = Instant::now();
    let err = client.call("get_quotes", json!({})).await.unwrap_err();

    match err {
        ClientError::Transport(TransportError::Other(message)) => {
            assert_eq!(message, "bad argument");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.closes(), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn connection_error_reconnects_once_then_succeeds() {
    let transport = ScriptedTransport::new([
        Step::ConnectionLost,
        Step::Ok(ToolResult::text("recovered")),
    ]);
    let client = McpClient::with_transport(test_config(), transport.clone());

    let started = Instant::now();
    let result = client.call("get_holdings", json!({})).await.unwrap();

    assert_eq!(result.collect_text(), "recovered");
    // Lazy connect, then exactly one close+connect cycle.
    assert_eq!(transport.opens(), 2);
    assert_eq!(transport.closes(), 1);
    // One backoff sleep at the base delay.
    assert_eq!(started.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn connection_error_exhaustion_reraises_original() {
    let transport = ScriptedTransport::new([
        Step::ConnectionLost,
        Step::ConnectionLost,
        Step::ConnectionLost,
        Step::ConnectionLost,
    ]);
    let client = McpClient::with_transport(test_config(), transport.clone());

    let err = client.call("get_holdings", json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::ConnectionLost(_))
    ));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn slow_call_times_out_and_reconnects() {
    let transport =
        ScriptedTransport::new([Step::Hang, Step::Ok(ToolResult::text("finally"))]);
    let mut config = test_config();
    config.retry.call_timeout_secs = Some(2.0);
    let client = McpClient::with_transport(config, transport.clone());

    let started = Instant::now();
    let result = client.call("get_quotes", json!({})).await.unwrap();

    assert_eq!(result.collect_text(), "finally");
    assert_eq!(transport.opens(), 2);
    assert_eq!(transport.closes(), 1);
    // 2s timeout plus the 1s backoff sleep.
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test]
async fn lifecycle_is_idempotent() {
    let transport = ScriptedTransport::new([]);
    let client = McpClient::with_transport(test_config(), transport.clone());

    client.connect().await.unwrap();
    client.connect().await.unwrap();
    assert_eq!(transport.opens(), 1);

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert_eq!(transport.closes(), 1);

    // Close then reconnect allocates a fresh session.
    client.connect().await.unwrap();
    assert_eq!(transport.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn client_rate_limiter_delays_bursts() {
    let transport = ScriptedTransport::new([]);
    let mut config = Config::default();
    config.rate_limit.max_requests = 2;
    let client = McpClient::with_transport(config, transport.clone());

    let started = Instant::now();
    for _ in 0..3 {
        client.call("ping", json!({})).await.unwrap();
    }
    // The third call waits out the 1s window.
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn invalid_config_is_rejected_at_construction() {
    let mut config = Config::default();
    config.transport.url = "not a url".to_string();
    let err = McpClient::new(config).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}
