//! MCP over server-sent events
//!
//! The client opens a long-lived GET stream. The server's first event names
//! the URL to POST requests to; responses come back as `message` events on
//! the stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

use super::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::transport::{await_response, Inbox, McpTransport};
use super::McpError;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser
#[derive(Debug, Default)]
pub(crate) struct EventBuffer {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl EventBuffer {
    /// Feed a chunk of the stream, returning every event it completes
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.line(line.trim_end_matches(|c| c == '\n' || c == '\r')) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever the stream ended with
    pub(crate) fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw).into_owned();
            if let Some(event) = self.line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Legacy HTTP+SSE transport
pub struct SseTransport {
    server: String,
    client: Client,
    post_url: Url,
    inbox: Arc<Inbox>,
    reader: JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream and wait for the server to announce its POST URL
    pub async fn connect(
        server: &str,
        url: Url,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()?;

        let response = tokio::time::timeout(
            timeout,
            client
                .get(url.clone())
                .header(ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| McpError::Timeout)??;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Transport(format!(
                "HTTP {} opening event stream at {}",
                status, url
            )));
        }

        let inbox = Arc::new(Inbox::default());
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(read_stream(
            server.to_string(),
            response,
            inbox.clone(),
            endpoint_tx,
        ));

        let endpoint = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                reader.abort();
                return Err(McpError::Protocol(
                    "event stream ended before announcing an endpoint".into(),
                ));
            }
            Err(_) => {
                reader.abort();
                return Err(McpError::Timeout);
            }
        };
        let post_url = url.join(&endpoint).map_err(|e| {
            McpError::Protocol(format!("invalid endpoint '{}' announced: {}", endpoint, e))
        })?;
        debug!(server = %server, endpoint = %post_url, "MCP event stream open");

        Ok(Self {
            server: server.to_string(),
            client,
            post_url,
            inbox,
            reader,
        })
    }

    async fn post(&self, body: &impl serde::Serialize) -> Result<String, McpError> {
        let response = self.client.post(self.post_url.clone()).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(McpError::Transport(format!(
                "HTTP {} from {}: {}",
                status, self.post_url, text
            )));
        }
        Ok(text)
    }
}

async fn read_stream(
    server: String,
    response: reqwest::Response,
    inbox: Arc<Inbox>,
    endpoint_tx: oneshot::Sender<String>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut stream = response.bytes_stream();
    let mut buffer = EventBuffer::default();

    let mut handle = |event: SseEvent| match event.event.as_str() {
        "endpoint" => {
            if let Some(tx) = endpoint_tx.take() {
                let _ = tx.send(event.data.trim().to_string());
            }
        }
        "message" => match JsonRpcResponse::parse(&event.data) {
            Some(response) => inbox.deliver(response),
            None => debug!(server = %server, data = %event.data, "ignoring server message"),
        },
        other => debug!(server = %server, event = other, "ignoring event"),
    };

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for event in buffer.push(&bytes) {
                    handle(event);
                }
            }
            Err(e) => {
                debug!(error = %e, "event stream failed");
                break;
            }
        }
    }
    if let Some(event) = buffer.finish() {
        handle(event);
    }
    inbox.close("event stream ended");
}

#[async_trait]
impl McpTransport for SseTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let id = request.id;
        let rx = self.inbox.expect(id)?;
        match self.post(&request).await {
            Ok(body) => {
                // Some servers answer inline instead of on the stream.
                if let Some(response) = JsonRpcResponse::parse(&body) {
                    self.inbox.deliver(response);
                }
            }
            Err(e) => {
                self.inbox.forget(id);
                return Err(e);
            }
        }
        await_response(rx).await
    }

    async fn notify(&self, notification: JsonRpcNotification) -> Result<(), McpError> {
        self.post(&notification).await.map(|_| ())
    }

    async fn close(&self) {
        self.reader.abort();
        self.inbox.close(format!("server '{}' was shut down", self.server));
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_split_across_chunks() {
        let mut buffer = EventBuffer::default();
        assert!(buffer.push(b"event: endpoint\nda").is_empty());
        let events = buffer.push(b"ta: /messages?session=1\n\n: keep-alive\n\ndata: {\"a\":1}\r\n\r\n");
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: "endpoint".into(),
                    data: "/messages?session=1".into()
                },
                SseEvent {
                    event: "message".into(),
                    data: "{\"a\":1}".into()
                },
            ]
        );
    }

    #[test]
    fn test_multi_line_data_and_unterminated_tail() {
        let mut buffer = EventBuffer::default();
        assert!(buffer.push(b"data: first\ndata: second\n").is_empty());
        assert_eq!(
            buffer.finish(),
            Some(SseEvent {
                event: "message".into(),
                data: "first\nsecond".into()
            })
        );
        assert_eq!(buffer.finish(), None);
    }
}
