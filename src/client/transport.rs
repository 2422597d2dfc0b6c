//! Transport layer for the MCP session
//!
//! [`ToolTransport`] is the seam between the retrying client and the wire.
//! [`SseTransport`] is the production implementation: JSON-RPC requests are
//! POSTed to a message endpoint the server announces on an SSE stream, and
//! responses come back as `message` events on that stream.

use crate::client::errors::TransportError;
use crate::config::TransportConfig;
use crate::core::types::ToolResult;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Remote tool-invocation primitive
///
/// Implementations classify their failures into [`TransportError`] variants;
/// the retry loop upstream never inspects message text.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Establish the session. Idempotent.
    async fn open(&self) -> Result<(), TransportError>;

    /// Invoke a named remote tool
    async fn call_tool(&self, name: &str, arguments: Value)
    -> Result<ToolResult, TransportError>;

    /// Tear the session down. Idempotent, best-effort.
    async fn close(&self) -> Result<(), TransportError>;
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

struct SseSession {
    endpoint: Url,
    reader: JoinHandle<()>,
}

/// SSE + JSON-RPC transport over `reqwest`
pub struct SseTransport {
    http: reqwest::Client,
    config: TransportConfig,
    session: Mutex<Option<SseSession>>,
    pending: PendingMap,
    next_id: AtomicU64,
}

impl SseTransport {
    /// Create an unopened transport for the configured endpoint
    pub fn new(config: TransportConfig) -> crate::client::errors::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            config,
            session: Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        })
    }

    async fn endpoint(&self) -> Result<Url, TransportError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.endpoint.clone())
            .ok_or_else(|| TransportError::ConnectionLost("transport not open".to_string()))
    }

    async fn post(&self, endpoint: &Url, body: &Value) -> Result<(), TransportError> {
        let mut request = self.http.post(endpoint.clone()).json(body);
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let response = request.send().await.map_err(classify_reqwest)?;
        check_status(response).map(|_| ())
    }

    /// Send a JSON-RPC request and wait for the routed response
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let endpoint = self.endpoint().await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if let Err(e) = self.post(&endpoint, &body).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let message = rx.await.map_err(|_| {
            TransportError::ConnectionLost("session closed while waiting for response".to_string())
        })?;

        if let Some(error) = message.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let text = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error");
            return Err(
                classify_failure_text(text).unwrap_or_else(|| TransportError::Rpc {
                    code,
                    message: text.to_string(),
                }),
            );
        }
        Ok(message.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Fire-and-forget JSON-RPC notification
    async fn notify(&self, method: &str) -> Result<(), TransportError> {
        let endpoint = self.endpoint().await?;
        let body = json!({ "jsonrpc": "2.0", "method": method });
        self.post(&endpoint, &body).await
    }

    /// MCP handshake performed right after the endpoint event arrives
    async fn initialize(&self) -> Result<(), TransportError> {
        let params = json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        self.request("initialize", params).await?;
        self.notify("notifications/initialized").await?;
        debug!("mcp session initialized");
        Ok(())
    }
}

#[async_trait]
impl ToolTransport for SseTransport {
    async fn open(&self) -> Result<(), TransportError> {
        {
            let mut session = self.session.lock().await;
            if session.is_some() {
                return Ok(());
            }

            let mut request = self
                .http
                .get(&self.config.url)
                .header("Accept", "text/event-stream");
            for (key, value) in &self.config.headers {
                request = request.header(key.as_str(), value.as_str());
            }
            let response = request.send().await.map_err(classify_reqwest)?;
            let response = check_status(response)?;

            let base = Url::parse(&self.config.url)
                .map_err(|e| TransportError::Other(format!("invalid endpoint url: {}", e)))?;
            let mut stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            // The server announces the message-POST endpoint in the first
            // `endpoint` event; nothing can be sent before it arrives.
            let endpoint = loop {
                let chunk = match stream.next().await {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        return Err(TransportError::ConnectionLost(format!(
                            "sse stream failed during setup: {}",
                            e
                        )));
                    }
                    None => {
                        return Err(TransportError::ConnectionLost(
                            "sse stream closed before endpoint event".to_string(),
                        ));
                    }
                };

                let mut found = None;
                for event in decoder.feed(&chunk) {
                    if event.name == "endpoint" {
                        found = Some(base.join(event.data.trim()).map_err(|e| {
                            TransportError::Other(format!("bad endpoint from server: {}", e))
                        })?);
                    }
                }
                if let Some(endpoint) = found {
                    break endpoint;
                }
            };
            debug!(endpoint = %endpoint, "sse session established");

            let pending = self.pending.clone();
            let reader = tokio::spawn(async move {
                while let Some(item) = stream.next().await {
                    let chunk = match item {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            warn!("sse stream error: {}", e);
                            break;
                        }
                    };
                    for event in decoder.feed(&chunk) {
                        if event.name != "message" {
                            debug!(event = %event.name, "ignoring sse event");
                            continue;
                        }
                        match serde_json::from_str::<Value>(&event.data) {
                            Ok(message) => dispatch(&pending, message).await,
                            Err(e) => warn!("undecodable sse message: {}", e),
                        }
                    }
                }
                // Stream gone: wake up whatever is still waiting. Dropping
                // the senders fails the matching receivers.
                pending.lock().await.clear();
            });

            *session = Some(SseSession { endpoint, reader });
        }

        // A session that cannot complete the handshake is useless; tear it
        // back down so the next open() starts clean.
        if let Err(e) = self.initialize().await {
            let _ = self.close().await;
            return Err(e);
        }
        Ok(())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolResult, TransportError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        let result: ToolResult = serde_json::from_value(result)
            .map_err(|e| TransportError::Other(format!("undecodable tool result: {}", e)))?;

        // Tool-level failures arrive as content text with isError set.
        if result.is_error {
            let text = result.collect_text();
            return Err(classify_failure_text(&text).unwrap_or(TransportError::Other(text)));
        }
        Ok(result)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session.reader.abort();
        // Cancellation (or a panic) during teardown is not interesting.
        let _ = session.reader.await;
        self.pending.lock().await.clear();
        debug!("sse session closed");
        Ok(())
    }
}

/// Route a JSON-RPC response to the request that is waiting for it
async fn dispatch(pending: &PendingMap, message: Value) {
    let Some(id) = message.get("id").and_then(Value::as_u64) else {
        debug!("server notification: {}", message);
        return;
    };
    match pending.lock().await.remove(&id) {
        Some(tx) => {
            let _ = tx.send(message);
        }
        None => warn!(id, "response for unknown request id"),
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(TransportError::RateLimited(format!("http {}", status)));
    }
    if status.is_server_error() {
        return Err(TransportError::ConnectionLost(format!("http {}", status)));
    }
    if !status.is_success() {
        return Err(TransportError::Other(format!("http {}", status)));
    }
    Ok(response)
}

fn classify_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() || error.is_request() || error.is_body() {
        TransportError::ConnectionLost(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

/// Substring heuristics for failures that only arrive as prose (JSON-RPC
/// error messages, tool-level error text). Contained here so the retry
/// loop can match on variants alone.
fn classify_failure_text(message: &str) -> Option<TransportError> {
    let lowered = message.to_lowercase();
    if lowered.contains("429") || lowered.contains("too many requests") {
        Some(TransportError::RateLimited(message.to_string()))
    } else if lowered.contains("broken") || lowered.contains("connection") {
        Some(TransportError::ConnectionLost(message.to_string()))
    } else {
        None
    }
}

/// One decoded server-sent event
struct SseEvent {
    name: String,
    data: String,
}

/// Incremental SSE frame decoder
///
/// Handles `event:`/`data:` fields, multi-line data, CRLF endings, and
/// comment lines. A blank line terminates a frame.
#[derive(Default)]
struct SseDecoder {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.event.is_some() || !self.data.is_empty() {
                    events.push(SseEvent {
                        name: self
                            .event
                            .take()
                            .unwrap_or_else(|| "message".to_string()),
                        data: self.data.drain(..).collect::<Vec<_>>().join("\n"),
                    });
                }
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data.push(rest.trim_start().to_string());
            }
            // Lines starting with ':' are keep-alive comments; anything
            // else is a field we do not use.
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_single_frame() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"event: endpoint\ndata: /messages?session=abc\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "endpoint");
        assert_eq!(events[0].data, "/messages?session=abc");
    }

    #[test]
    fn test_decoder_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"event: mess").is_empty());
        assert!(decoder.feed(b"age\ndata: {\"jsonrpc\"").is_empty());
        let events = decoder.feed(b":\"2.0\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "message");
        assert_eq!(events[0].data, "{\"jsonrpc\":\"2.0\"}");
    }

    #[test]
    fn test_decoder_multi_line_data_and_crlf() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: first\r\ndata: second\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn test_decoder_defaults_to_message_event() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: {}\n\n");
        assert_eq!(events[0].name, "message");
    }

    #[test]
    fn test_decoder_ignores_comments() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b": keep-alive\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn test_classify_failure_text() {
        assert!(matches!(
            classify_failure_text("HTTP 429 Too Many Requests"),
            Some(TransportError::RateLimited(_))
        ));
        assert!(matches!(
            classify_failure_text("broken pipe"),
            Some(TransportError::ConnectionLost(_))
        ));
        assert!(matches!(
            classify_failure_text("Connection reset by peer"),
            Some(TransportError::ConnectionLost(_))
        ));
        assert!(classify_failure_text("invalid instrument").is_none());
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    //! Scripted transport for unit and integration tests
    //!
    //! Available to downstream test code through the `test-util` feature.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// One scripted outcome for a `call_tool` invocation
    pub enum Step {
        Ok(ToolResult),
        RateLimited,
        ConnectionLost,
        Hang,
        Other(String),
    }

    /// Transport that replays a fixed script and counts lifecycle calls
    pub struct ScriptedTransport {
        opens: AtomicUsize,
        closes: AtomicUsize,
        calls: AtomicUsize,
        script: Mutex<VecDeque<Step>>,
    }

    impl ScriptedTransport {
        pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
            Arc::new(Self {
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                script: Mutex::new(steps.into_iter().collect()),
            })
        }

        pub fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolTransport for ScriptedTransport {
        async fn open(&self) -> Result<(), TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: Value,
        ) -> Result<ToolResult, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().await.pop_front();
            match step {
                Some(Step::Ok(result)) => Ok(result),
                Some(Step::RateLimited) => Err(TransportError::RateLimited(
                    "http 429 too many requests".to_string(),
                )),
                Some(Step::ConnectionLost) => {
                    Err(TransportError::ConnectionLost("connection broken".to_string()))
                }
                Some(Step::Hang) => std::future::pending().await,
                Some(Step::Other(message)) => Err(TransportError::Other(message)),
                None => Ok(ToolResult::text("ok")),
            }
        }

        async fn close(&self) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
