//! Declarative tool descriptors
//!
//! Pipeline files list tools by kind; each descriptor is resolved into
//! registry handles exactly once, when the pipeline is built. An MCP server
//! descriptor yields one handle per tool the server offers.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Config, Result, RoundtableError};
use crate::tools::file::WriteFileTool;
use crate::tools::http::{HttpTool, RemoteEndpoint};
use crate::tools::image::ImageGenerateTool;
use crate::tools::langflow::LangflowTool;
use crate::tools::mcp::McpServer;
use crate::tools::registry::ToolHandle;
use crate::tools::weather::WeatherTool;

/// A tool entry in a pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolDescriptor {
    /// Current weather lookup
    Weather {
        #[serde(default)]
        name: Option<String>,
    },
    /// Langflow chat flow
    Langflow {
        #[serde(default)]
        name: Option<String>,
        /// Overrides `tools.langflow_url`
        #[serde(default)]
        url: Option<String>,
    },
    /// Stable Diffusion image generation
    ImageGenerate {
        #[serde(default)]
        name: Option<String>,
        /// Overrides `tools.image_url`
        #[serde(default)]
        url: Option<String>,
    },
    /// Generic remote JSON tool
    Http {
        name: String,
        description: String,
        #[serde(default)]
        parameters: Option<Value>,
        endpoint: RemoteEndpoint,
    },
    /// Sandboxed file writer
    WriteFile {
        #[serde(default)]
        name: Option<String>,
        /// Overrides `tools.workspace_root`
        #[serde(default)]
        root: Option<PathBuf>,
    },
    /// Every tool offered by a Model Context Protocol server
    Mcp(McpServer),
}

impl ToolDescriptor {
    /// Build the tool handles this descriptor names
    pub async fn resolve(&self, config: &Config) -> Result<Vec<ToolHandle>> {
        let tools = &config.tools;
        let handle: ToolHandle = match self {
            ToolDescriptor::Weather { name } => {
                let endpoint = RemoteEndpoint::new(format!(
                    "{}/current.json",
                    tools.weather_url.trim_end_matches('/')
                ))
                .timeout_secs(tools.timeout_secs);
                let tool = WeatherTool::new(endpoint.connect()?, tools.weather_api_key.clone());
                Arc::new(rename(tool, name, |t, n| t.with_name(n)))
            }
            ToolDescriptor::Langflow { name, url } => {
                let url = url
                    .clone()
                    .or_else(|| tools.langflow_url.clone())
                    .ok_or_else(|| RoundtableError::config("LANGFLOW_API_URL is not set"))?;
                let mut endpoint = RemoteEndpoint::new(url)
                    .header("Content-Type", "application/json")
                    .timeout_secs(tools.timeout_secs);
                if let Some(token) = &tools.langflow_auth_token {
                    endpoint = endpoint.header("Authorization", format!("Bearer {}", token));
                }
                if let Some(key) = &tools.langflow_api_key {
                    endpoint = endpoint.header("x-api-key", key.clone());
                }
                let tool = LangflowTool::new(endpoint.connect()?);
                Arc::new(rename(tool, name, |t, n| t.with_name(n)))
            }
            ToolDescriptor::ImageGenerate { name, url } => {
                let base = url
                    .clone()
                    .or_else(|| tools.image_url.clone())
                    .ok_or_else(|| RoundtableError::config("STABLE_DIFFUSION_URL is not set"))?;
                let endpoint =
                    RemoteEndpoint::new(format!("{}/generate", base.trim_end_matches('/')))
                        .header("accept", "application/json")
                        .timeout_secs(tools.timeout_secs);
                let tool = ImageGenerateTool::new(endpoint.connect()?);
                Arc::new(rename(tool, name, |t, n| t.with_name(n)))
            }
            ToolDescriptor::Http {
                name,
                description,
                parameters,
                endpoint,
            } => Arc::new(HttpTool::new(
                name.clone(),
                description.clone(),
                parameters.clone(),
                endpoint.connect()?,
            )),
            ToolDescriptor::WriteFile { name, root } => {
                let root = root.clone().unwrap_or_else(|| tools.workspace_root.clone());
                Arc::new(rename(WriteFileTool::new(root), name, |t, n| t.with_name(n)))
            }
            ToolDescriptor::Mcp(server) => return server.discover().await,
        };
        Ok(vec![handle])
    }
}

fn rename<T>(tool: T, name: &Option<String>, with_name: impl FnOnce(T, String) -> T) -> T {
    match name {
        Some(name) => with_name(tool, name.clone()),
        None => tool,
    }
}
