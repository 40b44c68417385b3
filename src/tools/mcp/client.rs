//! MCP session: handshake, tool discovery and tool calls

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::protocol::{
    InitializeParams, JsonRpcNotification, JsonRpcRequest, ListToolsResult, McpToolDefinition,
    ToolCallParams, ToolCallResult,
};
use super::transport::McpTransport;
use super::McpError;

/// Upper bound on `tools/list` pages followed
const MAX_LIST_PAGES: usize = 32;

/// An initialized connection to one MCP server
pub struct McpClient {
    server: String,
    transport: Box<dyn McpTransport>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl McpClient {
    /// Perform the initialize handshake over `transport`
    pub async fn initialize(
        server: impl Into<String>,
        transport: Box<dyn McpTransport>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let client = Self {
            server: server.into(),
            transport,
            next_id: AtomicU64::new(1),
            timeout,
        };

        let params = serde_json::to_value(InitializeParams::default())?;
        let response = client.call("initialize", Some(params)).await?;
        debug!(
            server = %client.server,
            protocol = %response["protocolVersion"],
            "MCP server initialized"
        );

        client
            .transport
            .notify(JsonRpcNotification::new("notifications/initialized", None))
            .await?;
        Ok(client)
    }

    /// Server label
    pub fn server(&self) -> &str {
        &self.server
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let response = tokio::time::timeout(self.timeout, self.transport.request(request))
            .await
            .map_err(|_| McpError::Timeout)??;
        response.into_result()
    }

    /// Every tool the server offers, following pagination
    pub async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_LIST_PAGES {
            let params = cursor
                .take()
                .map(|cursor| serde_json::json!({ "cursor": cursor }));
            let page: ListToolsResult = serde_json::from_value(self.call("tools/list", params).await?)
                .map_err(|e| McpError::Protocol(format!("failed to parse tools list: {}", e)))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        info!(server = %self.server, tools = tools.len(), "MCP tools listed");
        Ok(tools)
    }

    /// Call a tool and flatten its content to text
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, McpError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let params = serde_json::to_value(ToolCallParams {
            name: name.to_string(),
            arguments,
        })?;
        let result: ToolCallResult = serde_json::from_value(self.call("tools/call", Some(params)).await?)
            .map_err(|e| McpError::Protocol(format!("failed to parse tool result: {}", e)))?;

        if result.is_error {
            return Err(McpError::ToolFailed(result.text()));
        }
        Ok(result.text())
    }

    /// Close the connection
    pub async fn shutdown(&self) {
        self.transport.close().await;
    }
}
