//! Per-turn context handed to the active participant
//!
//! The context is the participant's only window onto the run: a read-only
//! view of the history, the run's cancellation token, and access to the tools
//! bound to that participant. Every tool exchange is recorded so the
//! orchestrator can append it to the transcript once the turn settles.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::{ToolCall, ToolDefinition, ToolError, ToolResult};
use crate::team::history::History;
use crate::tools::ToolRegistry;

/// What the active participant can see and do during its turn
pub struct TurnContext<'a> {
    participant: &'a str,
    bound_tools: &'a [String],
    history: &'a History,
    registry: &'a ToolRegistry,
    cancel: &'a CancellationToken,
    tool_timeout: Option<Duration>,
    exchanges: Vec<(ToolCall, ToolResult)>,
}

impl<'a> TurnContext<'a> {
    pub fn new(
        participant: &'a str,
        bound_tools: &'a [String],
        history: &'a History,
        registry: &'a ToolRegistry,
        cancel: &'a CancellationToken,
        tool_timeout: Option<Duration>,
    ) -> Self {
        Self {
            participant,
            bound_tools,
            history,
            registry,
            cancel,
            tool_timeout,
            exchanges: Vec::new(),
        }
    }

    /// Id of the participant taking the turn
    pub fn participant(&self) -> &str {
        self.participant
    }

    /// The transcript so far
    pub fn history(&self) -> &History {
        self.history
    }

    /// The seeded task
    pub fn task(&self) -> &str {
        self.history.task().unwrap_or_default()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Definitions of the tools bound to this participant
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions_for(self.bound_tools)
    }

    /// Invoke a bound tool and record the exchange
    ///
    /// Failures are returned to the caller, never raised past the turn.
    /// Tools that exist in the registry but are not bound to this participant
    /// are reported as unknown.
    pub async fn invoke_tool(&mut self, call: ToolCall) -> Result<String, ToolError> {
        let call = if call.id.is_empty() {
            let id = format!("{}-{}", self.participant, self.exchanges.len() + 1);
            call.with_id(id)
        } else {
            call
        };

        let outcome = if self.bound_tools.iter().any(|name| *name == call.name) {
            self.registry
                .invoke(&call.name, call.arguments.clone(), self.tool_timeout)
                .await
        } else {
            Err(ToolError::UnknownTool(call.name.clone()))
        };

        let result = match &outcome {
            Ok(output) => ToolResult::success(&call, output.clone()),
            Err(e) => ToolResult::failure(&call, e.to_string()),
        };
        self.exchanges.push((call, result));
        outcome
    }

    /// Invoke a bound tool by name
    pub async fn invoke(
        &mut self,
        name: impl Into<String>,
        arguments: Value,
    ) -> Result<String, ToolError> {
        self.invoke_tool(ToolCall::new(name, arguments)).await
    }

    /// Tool exchanges recorded so far, in call order
    pub fn exchanges(&self) -> &[(ToolCall, ToolResult)] {
        &self.exchanges
    }

    pub(crate) fn into_exchanges(self) -> Vec<(ToolCall, ToolResult)> {
        self.exchanges
    }
}
