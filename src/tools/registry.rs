//! Tool registry - maps tool names to invocable handles
//!
//! The registry is plain bookkeeping: it is built once at configuration time,
//! then shared read-only (behind an `Arc`) by every run that needs it.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{Config, Result, ToolDefinition, ToolError};
use crate::tools::descriptor::ToolDescriptor;
use crate::tools::traits::Tool;

/// Shared handle to a registered tool
pub type ToolHandle = Arc<dyn Tool>;

/// Registry of available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolHandle>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve declarative descriptors into a registry
    ///
    /// MCP servers are connected and asked for their tools here, once.
    pub async fn from_descriptors(descriptors: &[ToolDescriptor], config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            for handle in descriptor.resolve(config).await? {
                registry.register_handle(handle)?;
            }
        }
        Ok(registry)
    }

    /// Register a tool
    pub fn register(&mut self, tool: impl Tool + 'static) -> std::result::Result<(), ToolError> {
        self.register_handle(Arc::new(tool))
    }

    /// Register an already shared tool handle
    pub fn register_handle(&mut self, handle: ToolHandle) -> std::result::Result<(), ToolError> {
        let name = handle.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        debug!(tool = %name, "registered tool");
        self.tools.insert(name, handle);
        Ok(())
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> std::result::Result<ToolHandle, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions for all tools, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Definitions for the named tools, skipping unknown names
    pub fn definitions_for(&self, names: &[String]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Invoke a tool by name
    ///
    /// Every failure of the underlying capability (error, panic, or timeout)
    /// comes back as `ToolError::ToolInvocation`.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        timeout: Option<Duration>,
    ) -> std::result::Result<String, ToolError> {
        let tool = self.resolve(name)?;
        debug!(tool = %name, "invoking tool");

        let call = AssertUnwindSafe(tool.invoke(arguments)).catch_unwind();
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tool = %name, timeout_ms = limit.as_millis() as u64, "tool timed out");
                    return Err(ToolError::invocation(
                        name,
                        format!("timed out after {}ms", limit.as_millis()),
                    ));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "tool failed");
                Err(ToolError::invocation(name, e))
            }
            Err(_) => {
                warn!(tool = %name, "tool panicked");
                Err(ToolError::invocation(name, "tool panicked"))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
