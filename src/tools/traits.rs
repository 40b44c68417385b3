//! Tool trait for capabilities exposed to participants
//!
//! Any collaborator with a name and an async `invoke` can be registered.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;

use crate::core::{Result, ToolDefinition};

/// A named capability that participants can invoke with JSON arguments
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name of the tool, unique within a registry
    fn name(&self) -> &str;

    /// Short description offered to chat models
    fn description(&self) -> &str;

    /// JSON schema of the arguments
    fn parameters(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// Run the tool
    async fn invoke(&self, arguments: Value) -> Result<String>;

    /// Function definition for chat models
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}

/// Tool backed by an async closure
pub struct FnTool<F, Fut> {
    name: String,
    description: String,
    parameters: Value,
    func: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnTool<F, Fut>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    /// Wrap a closure as a tool
    pub fn new(name: impl Into<String>, description: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({ "type": "object", "properties": {} }),
            func,
            _fut: PhantomData,
        }
    }

    /// Set the JSON schema of the arguments
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F, Fut>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        (self.func)(arguments).await
    }
}
