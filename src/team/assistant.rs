//! Model-backed participant
//!
//! Rebuilds a chat transcript from the run history on every turn, so the
//! participant holds no conversation state of its own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{MessageContent, ParticipantError, ToolCall};
use crate::llm::{ChatMessage, GenerateOptions, LLMProvider};
use crate::team::context::TurnContext;
use crate::team::history::History;
use crate::team::participant::Participant;

/// Participant that answers with a chat model and may call its bound tools
pub struct AssistantParticipant {
    id: String,
    provider: Arc<dyn LLMProvider>,
    model: String,
    system_prompt: Option<String>,
    tools: Vec<String>,
    max_tool_rounds: usize,
    options: Option<GenerateOptions>,
}

impl AssistantParticipant {
    pub fn new(
        id: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            model: model.into(),
            system_prompt: None,
            tools: Vec::new(),
            max_tool_rounds: 3,
            options: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Bind tools by registry name
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum model/tool round trips before a final tool-less call
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Chat transcript as seen by this participant
    ///
    /// Its own replies are assistant messages; everyone else speaks in the
    /// user role under their own name. Tool calls are left out, tool results
    /// are kept as context.
    pub fn build_transcript(&self, history: &History) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }

        for message in history.messages() {
            let own = message.source == self.id;
            let content = match &message.content {
                MessageContent::Text(text) => text.clone(),
                MessageContent::ToolCall(_) => continue,
                MessageContent::ToolResult(_) if own => continue,
                other => other.render(),
            };
            messages.push(if own {
                ChatMessage::assistant(content)
            } else {
                ChatMessage::user(content).with_name(chat_name(&message.source))
            });
        }
        messages
    }

    fn check_cancelled(ctx: &TurnContext<'_>) -> Result<(), ParticipantError> {
        if ctx.is_cancelled() {
            Err(ParticipantError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Chat APIs only accept `[A-Za-z0-9_-]` in sender names
fn chat_name(source: &str) -> String {
    source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl Participant for AssistantParticipant {
    fn id(&self) -> &str {
        &self.id
    }

    fn tools(&self) -> &[String] {
        &self.tools
    }

    async fn take_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, ParticipantError> {
        let mut messages = self.build_transcript(ctx.history());
        let definitions = ctx.tool_definitions();

        if !definitions.is_empty() {
            for round in 0..self.max_tool_rounds {
                Self::check_cancelled(ctx)?;
                let response = self
                    .provider
                    .chat_with_tools(&self.model, &messages, &definitions, self.options.clone())
                    .await?;

                if !response.has_tool_calls() {
                    return Ok(response.content);
                }

                let calls: Vec<ToolCall> = response
                    .tool_calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, call)| {
                        if call.id.is_empty() {
                            let id = format!("{}-r{}-{}", self.id, round + 1, i + 1);
                            call.with_id(id)
                        } else {
                            call
                        }
                    })
                    .collect();

                tracing::debug!(participant = %self.id, round, calls = calls.len(), "model requested tools");
                messages.push(ChatMessage::assistant_with_tools(
                    response.content,
                    calls.clone(),
                ));

                for call in calls {
                    let call_id = call.id.clone();
                    let output = match ctx.invoke_tool(call).await {
                        Ok(output) => output,
                        Err(e) => format!("Error: {}", e),
                    };
                    messages.push(ChatMessage::tool(call_id, output));
                }
            }
        }

        Self::check_cancelled(ctx)?;
        let response = self
            .provider
            .chat(&self.model, &messages, self.options.clone())
            .await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Result, RoundtableError, ToolDefinition};
    use crate::llm::LLMResponse;
    use crate::tools::{FnTool, ToolRegistry};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Replays canned responses and records what it was sent
    #[derive(Default)]
    struct MockProvider {
        responses: Mutex<VecDeque<LLMResponse>>,
        requests: Mutex<Vec<(Vec<ChatMessage>, usize)>>,
    }

    impl MockProvider {
        fn new(responses: Vec<LLMResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            }
        }
    }

    fn reply(content: &str, tool_calls: Vec<ToolCall>) -> LLMResponse {
        LLMResponse {
            content: content.to_string(),
            tool_calls,
            usage: None,
            model: "mock".to_string(),
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        async fn chat_with_tools(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            tools: &[ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), tools.len()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RoundtableError::model("no more responses"))
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["mock".to_string()])
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn weather_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(FnTool::new("get_weather", "Weather", |args: Value| async move {
                let city = args["city"].as_str().unwrap_or_default().to_string();
                Ok::<_, RoundtableError>(format!("Weather in {}: Sunny", city))
            }))
            .unwrap();
        registry
    }

    #[test]
    fn test_transcript_roles() {
        let provider = Arc::new(MockProvider::default());
        let assistant = AssistantParticipant::new("writer", provider, "m")
            .with_system_prompt("You write.");
        let mut history = History::seeded("Write a poem");
        history.append_text("writer", "Roses are red");
        history.append_text("critic bot", "Too short");

        let transcript = assistant.build_transcript(&history);
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].role, "system");
        assert_eq!(transcript[1].role, "user");
        assert_eq!(transcript[1].name.as_deref(), Some("user"));
        assert_eq!(transcript[2].role, "assistant");
        assert_eq!(transcript[3].name.as_deref(), Some("critic_bot"));
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let provider = Arc::new(MockProvider::new(vec![
            reply(
                "",
                vec![ToolCall::new("get_weather", json!({"city": "Taipei"})).with_id("c1")],
            ),
            reply("It is sunny in Taipei. TERMINATE", vec![]),
        ]));
        let assistant = AssistantParticipant::new("weather", provider.clone(), "m")
            .with_tools(["get_weather"]);
        let registry = weather_registry();
        let cancel = CancellationToken::new();
        let history = History::seeded("Weather in Taipei?");
        let mut ctx = TurnContext::new(
            "weather",
            assistant.tools(),
            &history,
            &registry,
            &cancel,
            None,
        );

        let answer = assistant.take_turn(&mut ctx).await.unwrap();
        assert_eq!(answer, "It is sunny in Taipei. TERMINATE");
        assert_eq!(ctx.exchanges().len(), 1);
        assert_eq!(ctx.exchanges()[0].1.output, "Weather in Taipei: Sunny");

        let requests = provider.requests.lock().unwrap();
        let (second, tool_count) = &requests[1];
        assert_eq!(*tool_count, 1);
        let tool_msg = second.last().unwrap();
        assert_eq!(tool_msg.role, "tool");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_round_limit_forces_plain_reply() {
        let call = || ToolCall::new("get_weather", json!({"city": "Oslo"}));
        let provider = Arc::new(MockProvider::new(vec![
            reply("", vec![call()]),
            reply("", vec![call()]),
            reply("Final answer", vec![]),
        ]));
        let assistant = AssistantParticipant::new("weather", provider.clone(), "m")
            .with_tools(["get_weather"])
            .with_max_tool_rounds(2);
        let registry = weather_registry();
        let cancel = CancellationToken::new();
        let history = History::seeded("Weather?");
        let mut ctx = TurnContext::new(
            "weather",
            assistant.tools(),
            &history,
            &registry,
            &cancel,
            None,
        );

        assert_eq!(assistant.take_turn(&mut ctx).await.unwrap(), "Final answer");
        assert_eq!(ctx.exchanges().len(), 2);
        assert_eq!(ctx.exchanges()[1].0.id, "weather-r2-1");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].1, 0);
    }

    #[tokio::test]
    async fn test_unbound_tool_fed_back_as_error() {
        let provider = Arc::new(MockProvider::new(vec![
            reply("", vec![ToolCall::new("delete_all", json!({})).with_id("x")]),
            reply("Could not do that", vec![]),
        ]));
        let assistant = AssistantParticipant::new("a", provider.clone(), "m")
            .with_tools(["get_weather"]);
        let registry = weather_registry();
        let cancel = CancellationToken::new();
        let history = History::seeded("task");
        let mut ctx =
            TurnContext::new("a", assistant.tools(), &history, &registry, &cancel, None);

        assert_eq!(assistant.take_turn(&mut ctx).await.unwrap(), "Could not do that");
        let requests = provider.requests.lock().unwrap();
        let tool_msg = requests[1].0.last().unwrap();
        assert_eq!(tool_msg.content, "Error: Unknown tool: delete_all");
    }

    #[tokio::test]
    async fn test_model_error_is_turn_failure() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let assistant = AssistantParticipant::new("a", provider, "m");
        let registry = ToolRegistry::new();
        let cancel = CancellationToken::new();
        let history = History::seeded("task");
        let mut ctx = TurnContext::new("a", &[], &history, &registry, &cancel, None);

        let err = assistant.take_turn(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ParticipantError::Model(_)));
    }
}
