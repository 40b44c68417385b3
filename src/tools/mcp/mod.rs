//! Model Context Protocol tool servers
//!
//! An `McpServer` descriptor is connected once, when the registry is built:
//! the client performs the initialize handshake, lists the server's tools and
//! registers one handle per tool. Every handle of a server shares that one
//! session. Stdio servers are child processes killed when the last handle is
//! dropped.

mod client;
mod protocol;
mod sse;
mod stdio;
mod streamable;
mod transport;

pub use client::McpClient;
pub use protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpToolDefinition};
pub use sse::SseTransport;
pub use stdio::StdioTransport;
pub use streamable::StreamableHttpTransport;
pub use transport::McpTransport;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::core::{Result, RoundtableError};
use crate::tools::http::{read_env, RemoteEndpoint};
use crate::tools::registry::ToolHandle;
use crate::tools::traits::Tool;

/// Errors talking to an MCP server
#[derive(Debug, Error)]
pub enum McpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server spawn failed: {0}")]
    SpawnFailed(String),

    #[error("timeout waiting for server response")]
    Timeout,

    #[error("tool error: {0}")]
    ToolFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// How to reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpTransportKind {
    /// Child process speaking JSON-RPC on stdin/stdout
    Stdio,
    /// GET event stream plus announced POST endpoint
    Sse,
    /// POST per message, JSON or event-stream replies
    StreamableHttp,
}

fn default_timeout_secs() -> u64 {
    30
}

/// A tool server entry in a pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServer {
    /// Label used in logs and errors
    pub server: String,
    pub transport: McpTransportKind,
    /// Program to run (stdio)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the child process (stdio)
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Host variables copied into the child environment (stdio)
    #[serde(default)]
    pub env_passthrough: Vec<String>,
    /// Server URL (sse, streamable_http)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Headers whose values are read from environment variables (header -> var)
    #[serde(default)]
    pub header_env: BTreeMap<String, String>,
    /// Environment variable holding a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_env: Option<String>,
    /// Timeout for the handshake and for each request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Register only these tools (empty = all)
    #[serde(default)]
    pub tool_allowlist: Vec<String>,
}

impl McpServer {
    /// A stdio server descriptor
    pub fn stdio(server: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(server, McpTransportKind::Stdio, Some(command.into()), args, None)
    }

    /// An HTTP server descriptor
    pub fn remote(server: impl Into<String>, transport: McpTransportKind, url: impl Into<String>) -> Self {
        Self::new(server, transport, None, Vec::new(), Some(url.into()))
    }

    fn new(
        server: impl Into<String>,
        transport: McpTransportKind,
        command: Option<String>,
        args: Vec<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            server: server.into(),
            transport,
            command,
            args,
            env: BTreeMap::new(),
            env_passthrough: Vec::new(),
            url,
            headers: BTreeMap::new(),
            header_env: BTreeMap::new(),
            bearer_env: None,
            timeout_secs: default_timeout_secs(),
            tool_allowlist: Vec::new(),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn unavailable(&self, cause: impl std::fmt::Display) -> RoundtableError {
        RoundtableError::config(format!("MCP server '{}' is unavailable: {}", self.server, cause))
    }

    fn endpoint(&self) -> Result<RemoteEndpoint> {
        let url = self.url.clone().ok_or_else(|| {
            RoundtableError::config(format!("MCP server '{}' needs a `url`", self.server))
        })?;
        Ok(RemoteEndpoint {
            url,
            headers: self.headers.clone(),
            header_env: self.header_env.clone(),
            bearer_env: self.bearer_env.clone(),
            timeout_secs: self.timeout_secs,
        })
    }

    /// Open the transport and perform the handshake
    pub async fn connect(&self) -> Result<McpClient> {
        let transport: Box<dyn McpTransport> = match self.transport {
            McpTransportKind::Stdio => {
                let command = self.command.as_deref().ok_or_else(|| {
                    RoundtableError::config(format!("MCP server '{}' needs a `command`", self.server))
                })?;
                let mut env = self.env.clone();
                for var in &self.env_passthrough {
                    env.insert(var.clone(), read_env(var, &self.server)?);
                }
                Box::new(
                    StdioTransport::spawn(&self.server, command, &self.args, &env)
                        .map_err(|e| self.unavailable(e))?,
                )
            }
            McpTransportKind::Sse => {
                let endpoint = self.endpoint()?;
                Box::new(
                    SseTransport::connect(
                        &self.server,
                        endpoint.parse_url()?,
                        endpoint.resolve_headers()?,
                        self.timeout(),
                    )
                    .await
                    .map_err(|e| self.unavailable(e))?,
                )
            }
            McpTransportKind::StreamableHttp => {
                let endpoint = self.endpoint()?;
                Box::new(
                    StreamableHttpTransport::new(
                        &self.server,
                        endpoint.parse_url()?,
                        endpoint.resolve_headers()?,
                        self.timeout(),
                    )
                    .map_err(|e| self.unavailable(e))?,
                )
            }
        };

        McpClient::initialize(self.server.clone(), transport, self.timeout())
            .await
            .map_err(|e| self.unavailable(e))
    }

    /// Connect and return one tool handle per offered (and allowed) tool
    pub async fn discover(&self) -> Result<Vec<ToolHandle>> {
        let client = Arc::new(self.connect().await?);
        let offered = client.list_tools().await.map_err(|e| self.unavailable(e))?;

        for wanted in &self.tool_allowlist {
            if !offered.iter().any(|tool| &tool.name == wanted) {
                return Err(RoundtableError::config(format!(
                    "MCP server '{}' does not offer tool '{}'",
                    self.server, wanted
                )));
            }
        }

        let handles: Vec<ToolHandle> = offered
            .into_iter()
            .filter(|tool| self.tool_allowlist.is_empty() || self.tool_allowlist.contains(&tool.name))
            .map(|definition| Arc::new(McpTool::new(client.clone(), definition)) as ToolHandle)
            .collect();

        info!(
            server = %self.server,
            transport = ?self.transport,
            tools = handles.len(),
            "MCP tools registered"
        );
        Ok(handles)
    }
}

/// One remote tool, invoked through its server's session
pub struct McpTool {
    client: Arc<McpClient>,
    definition: McpToolDefinition,
    description: String,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, definition: McpToolDefinition) -> Self {
        let description = definition
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("{} (MCP server '{}')", definition.name, client.server()));
        Self {
            client,
            definition,
            description,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.definition.input_schema.clone()
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        Ok(self.client.call_tool(&self.definition.name, arguments).await?)
    }
}
