//! Error types for Roundtable
//!
//! Configuration-time failures surface as `RoundtableError` before a run
//! starts. Tool and participant failures are values that the orchestrator
//! turns into transcript messages instead of aborting the run.

use thiserror::Error;

/// Main error type for Roundtable operations
#[derive(Error, Debug)]
pub enum RoundtableError {
    /// Configuration errors (including mis-wired pipelines)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat model connection or API errors
    #[error("Model error: {0}")]
    Model(String),

    /// Tool registry errors
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// MCP tool server errors
    #[error("MCP error: {0}")]
    Mcp(#[from] crate::tools::mcp::McpError),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled before it completed
    #[error("Run cancelled")]
    CancellationRequested,

    /// The run used all of its turns without reaching the termination marker
    #[error("Turn budget exhausted after {max_turns} turns")]
    TurnBudgetExhausted { max_turns: usize },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Roundtable operations
pub type Result<T> = std::result::Result<T, RoundtableError>;

impl RoundtableError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors raised by the tool registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is registered (or bound to the caller)
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with this name is already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// The underlying capability failed or timed out
    #[error("Tool '{name}' failed: {cause}")]
    ToolInvocation { name: String, cause: String },
}

impl ToolError {
    /// Wrap a failure raised by a tool
    pub fn invocation(name: impl Into<String>, cause: impl ToString) -> Self {
        Self::ToolInvocation {
            name: name.into(),
            cause: cause.to_string(),
        }
    }
}

/// Errors a participant may return from its turn
#[derive(Error, Debug)]
pub enum ParticipantError {
    /// Cancellation was observed; the turn produced no message
    #[error("Cancellation requested")]
    Cancelled,

    /// The chat model behind the participant failed
    #[error("Model error: {0}")]
    Model(String),

    /// Any other turn failure
    #[error("{0}")]
    Failed(String),
}

impl ParticipantError {
    /// Create a generic turn failure
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<RoundtableError> for ParticipantError {
    fn from(error: RoundtableError) -> Self {
        match error {
            RoundtableError::CancellationRequested => Self::Cancelled,
            RoundtableError::Model(msg) => Self::Model(msg),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// A failed turn, recorded in the transcript under the participant's name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Participant '{participant}' turn failed: {cause}")]
pub struct ParticipantTurnError {
    pub participant: String,
    pub cause: String,
}

impl ParticipantTurnError {
    pub fn new(participant: impl Into<String>, cause: impl ToString) -> Self {
        Self {
            participant: participant.into(),
            cause: cause.to_string(),
        }
    }
}
