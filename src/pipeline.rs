//! Declarative pipelines
//!
//! A pipeline file names the tools a team needs and its participants in
//! speaking order. Everything is resolved once, when the team is built:
//! descriptors become registry handles, participant specs become
//! participants, and wiring mistakes surface as configuration errors.
//!
//! ```toml
//! task = "What is the weather in Taipei?"
//! marker = "TERMINATE"
//! max_turns = 6
//!
//! [[tools]]
//! kind = "weather"
//!
//! [[participants]]
//! kind = "tool"
//! name = "weather_agent"
//! tool = "get_weather"
//! arguments = { city = "{{task}}" }
//! suffix = "TERMINATE"
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Config, Result, RoundtableError};
use crate::llm::{LLMProvider, OpenAiClient};
use crate::team::{
    AssistantParticipant, ParticipantHandle, RoundRobinTeam, ScriptedParticipant, ToolParticipant,
};
use crate::tools::{ToolDescriptor, ToolRegistry};

/// A pipeline file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Default task when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Overrides `team.termination_marker`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Overrides `team.max_turns`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<usize>,
    /// Overrides `team.turn_timeout_secs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_timeout_secs: Option<u64>,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub participants: Vec<ParticipantSpec>,
}

/// A participant entry in a pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParticipantSpec {
    /// Fixed replies, one per turn
    Scripted { name: String, replies: Vec<String> },
    /// One tool call per turn
    Tool {
        name: String,
        tool: String,
        #[serde(default = "empty_arguments")]
        arguments: Value,
        #[serde(default)]
        suffix: Option<String>,
    },
    /// Chat model with optional tools
    Assistant {
        name: String,
        #[serde(default)]
        system_prompt: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
        /// Overrides `model.model`
        #[serde(default)]
        model: Option<String>,
        /// Overrides `team.max_tool_rounds`
        #[serde(default)]
        max_tool_rounds: Option<usize>,
    },
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

impl ParticipantSpec {
    pub fn name(&self) -> &str {
        match self {
            ParticipantSpec::Scripted { name, .. }
            | ParticipantSpec::Tool { name, .. }
            | ParticipantSpec::Assistant { name, .. } => name,
        }
    }

    fn is_assistant(&self) -> bool {
        matches!(self, ParticipantSpec::Assistant { .. })
    }

    fn resolve(
        &self,
        config: &Config,
        provider: Option<&Arc<dyn LLMProvider>>,
    ) -> Result<ParticipantHandle> {
        let handle: ParticipantHandle = match self {
            ParticipantSpec::Scripted { name, replies } => {
                if replies.is_empty() {
                    return Err(RoundtableError::config(format!(
                        "scripted participant '{}' has no replies",
                        name
                    )));
                }
                Arc::new(ScriptedParticipant::new(name.clone(), replies.clone()))
            }
            ParticipantSpec::Tool {
                name,
                tool,
                arguments,
                suffix,
            } => {
                let participant = ToolParticipant::new(name.clone(), tool.clone(), arguments.clone());
                Arc::new(match suffix {
                    Some(suffix) => participant.with_suffix(suffix.clone()),
                    None => participant,
                })
            }
            ParticipantSpec::Assistant {
                name,
                system_prompt,
                tools,
                model,
                max_tool_rounds,
            } => {
                let provider = provider
                    .cloned()
                    .ok_or_else(|| RoundtableError::config("no chat model provider configured"))?;
                let model = model.clone().unwrap_or_else(|| config.model.model.clone());
                let mut participant = AssistantParticipant::new(name.clone(), provider, model)
                    .with_tools(tools.clone())
                    .with_max_tool_rounds(max_tool_rounds.unwrap_or(config.team.max_tool_rounds));
                if let Some(prompt) = system_prompt {
                    participant = participant.with_system_prompt(prompt.clone());
                }
                Arc::new(participant)
            }
        };
        Ok(handle)
    }
}

impl PipelineSpec {
    /// Load a pipeline file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RoundtableError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a pipeline from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Whether any participant needs a chat model
    pub fn needs_model(&self) -> bool {
        self.participants.iter().any(ParticipantSpec::is_assistant)
    }

    /// Build the team, creating a chat client from `config` when needed
    pub async fn build(&self, config: &Config) -> Result<RoundRobinTeam> {
        let provider: Option<Arc<dyn LLMProvider>> = if self.needs_model() {
            Some(Arc::new(OpenAiClient::from_config(config)?))
        } else {
            None
        };
        self.build_with_provider(config, provider).await
    }

    /// Build the team with an explicit chat model provider
    pub async fn build_with_provider(
        &self,
        config: &Config,
        provider: Option<Arc<dyn LLMProvider>>,
    ) -> Result<RoundRobinTeam> {
        let registry = ToolRegistry::from_descriptors(&self.tools, config).await?;

        let mut builder = RoundRobinTeam::builder()
            .marker(
                self.marker
                    .clone()
                    .unwrap_or_else(|| config.team.termination_marker.clone()),
            )
            .max_turns(self.max_turns.unwrap_or(config.team.max_turns))
            .tool_timeout(config.team.tool_timeout())
            .tools(Arc::new(registry));

        if let Some(secs) = self.turn_timeout_secs.or(config.team.turn_timeout_secs) {
            builder = builder.turn_timeout(std::time::Duration::from_secs(secs));
        }

        for spec in &self.participants {
            builder = builder.participant_handle(spec.resolve(config, provider.as_ref())?);
        }

        builder.build()
    }
}
