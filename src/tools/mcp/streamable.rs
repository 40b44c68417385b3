//! MCP over streamable HTTP
//!
//! Every message is a POST to one endpoint. The server answers with either a
//! JSON body or a short event stream carrying the response.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::sse::EventBuffer;
use super::transport::McpTransport;
use super::McpError;

const SESSION_HEADER: &str = "Mcp-Session-Id";

pub struct StreamableHttpTransport {
    server: String,
    client: Client,
    url: Url,
    session: Mutex<Option<String>>,
}

impl StreamableHttpTransport {
    pub fn new(server: &str, url: Url, headers: HeaderMap, timeout: Duration) -> Result<Self, McpError> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            server: server.to_string(),
            client,
            url,
            session: Mutex::new(None),
        })
    }

    fn session_id(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn with_session(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session_id() {
            Some(id) => builder.header(SESSION_HEADER, id),
            None => builder,
        }
    }

    async fn post(&self, body: &impl Serialize) -> Result<Response, McpError> {
        let builder = self
            .client
            .post(self.url.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        let response = self.with_session(builder).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "HTTP {} from {}: {}",
                status, self.url, text
            )));
        }

        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self
                .session
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id.to_string());
        }
        Ok(response)
    }
}

/// Read the response to `id` from an event-stream body
async fn response_from_stream(response: Response, id: u64) -> Result<JsonRpcResponse, McpError> {
    let mut stream = response.bytes_stream();
    let mut buffer = EventBuffer::default();
    while let Some(chunk) = stream.next().await {
        for event in buffer.push(&chunk?) {
            if let Some(response) = JsonRpcResponse::parse(&event.data) {
                if response.id == Some(id) {
                    return Ok(response);
                }
            }
        }
    }
    buffer
        .finish()
        .and_then(|event| JsonRpcResponse::parse(&event.data))
        .filter(|response| response.id == Some(id))
        .ok_or_else(|| McpError::Protocol(format!("no response to request {} in event stream", id)))
}

#[async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let id = request.id;
        let response = self.post(&request).await?;

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if is_stream {
            return response_from_stream(response, id).await;
        }

        let text = response.text().await?;
        JsonRpcResponse::parse(&text)
            .filter(|response| response.id == Some(id))
            .ok_or_else(|| McpError::Protocol(format!("unexpected response body: {}", text)))
    }

    async fn notify(&self, notification: JsonRpcNotification) -> Result<(), McpError> {
        self.post(&notification).await.map(|_| ())
    }

    async fn close(&self) {
        if self.session_id().is_none() {
            return;
        }
        let builder = self.with_session(self.client.delete(self.url.clone()));
        if let Err(e) = builder.send().await {
            debug!(server = %self.server, error = %e, "failed to end MCP session");
        }
    }
}
