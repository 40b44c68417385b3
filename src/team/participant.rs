//! Participant contract and the reply-only and tool-using variants
//!
//! A participant sees the whole transcript through its [`TurnContext`] and
//! answers with exactly one text reply per turn. Tool calls made through the
//! context are recorded in the transcript ahead of that reply.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{Message, ParticipantError};
use crate::team::context::TurnContext;

/// A named member of a team
#[async_trait]
pub trait Participant: Send + Sync {
    /// Id, unique within a team
    fn id(&self) -> &str;

    /// Names of the tools this participant may invoke
    fn tools(&self) -> &[String] {
        &[]
    }

    /// Produce this participant's reply for the current turn
    ///
    /// Return `ParticipantError::Cancelled` when cancellation is observed;
    /// any other error is recorded in the transcript as a failed turn.
    async fn take_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, ParticipantError>;
}

/// Replies with a fixed script, one entry per turn
///
/// Once the script runs out, the last entry repeats. The position in the
/// script is derived from the transcript, so concurrent runs stay independent.
#[derive(Debug, Clone)]
pub struct ScriptedParticipant {
    id: String,
    replies: Vec<String>,
}

impl ScriptedParticipant {
    pub fn new<I, S>(id: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }

    fn turns_taken(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .filter(|m| m.source == self.id && m.text().is_some())
            .count()
    }
}

#[async_trait]
impl Participant for ScriptedParticipant {
    fn id(&self) -> &str {
        &self.id
    }

    async fn take_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, ParticipantError> {
        if ctx.is_cancelled() {
            return Err(ParticipantError::Cancelled);
        }
        let index = self.turns_taken(ctx.history().messages());
        let reply = self
            .replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_default();
        Ok(reply)
    }
}

/// Invokes one tool per turn and replies with its output
///
/// String values in the argument template may contain `{{task}}` (the seeded
/// task) and `{{last}}` (the most recent text message).
#[derive(Debug, Clone)]
pub struct ToolParticipant {
    id: String,
    tools: Vec<String>,
    arguments: Value,
    suffix: Option<String>,
}

impl ToolParticipant {
    pub fn new(id: impl Into<String>, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            tools: vec![tool.into()],
            arguments,
            suffix: None,
        }
    }

    /// Text appended to a successful reply, e.g. a termination marker
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    fn tool(&self) -> &str {
        &self.tools[0]
    }
}

/// Expand placeholders in every string of a JSON template
pub fn expand_template(template: &Value, task: &str, last: &str) -> Value {
    match template {
        Value::String(s) => Value::String(s.replace("{{task}}", task).replace("{{last}}", last)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| expand_template(item, task, last))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), expand_template(v, task, last)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[async_trait]
impl Participant for ToolParticipant {
    fn id(&self) -> &str {
        &self.id
    }

    fn tools(&self) -> &[String] {
        &self.tools
    }

    async fn take_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, ParticipantError> {
        if ctx.is_cancelled() {
            return Err(ParticipantError::Cancelled);
        }
        let task = ctx.task().to_string();
        let last = ctx.history().last_text().unwrap_or_default().to_string();
        let arguments = expand_template(&self.arguments, &task, &last);

        match ctx.invoke(self.tool(), arguments).await {
            Ok(output) => Ok(match &self.suffix {
                Some(suffix) => format!("{} {}", output, suffix),
                None => output,
            }),
            Err(e) => Ok(format!("Error: {}", e)),
        }
    }
}
