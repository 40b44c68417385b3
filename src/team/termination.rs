//! Termination conditions
//!
//! A condition looks only at the message a turn just appended. Matching is an
//! exact, case-sensitive substring test over text content; tool calls and
//! tool results never terminate a run.

use std::fmt::Debug;
use std::sync::Arc;

use crate::core::Message;

/// Decides whether a run is complete
pub trait TerminationCondition: Debug + Send + Sync {
    /// Whether this message ends the run
    fn is_terminal(&self, message: &Message) -> bool;
}

/// Shared termination handle
pub type TerminationHandle = Arc<dyn TerminationCondition>;

/// Terminates when any message mentions the marker
#[derive(Debug, Clone)]
pub struct TextMention {
    marker: String,
}

impl TextMention {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl TerminationCondition for TextMention {
    fn is_terminal(&self, message: &Message) -> bool {
        message
            .text()
            .is_some_and(|text| text.contains(self.marker.as_str()))
    }
}

/// Terminates when a specific participant mentions the marker
#[derive(Debug, Clone)]
pub struct SourceMention {
    source: String,
    mention: TextMention,
}

impl SourceMention {
    pub fn new(source: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mention: TextMention::new(marker),
        }
    }
}

impl TerminationCondition for SourceMention {
    fn is_terminal(&self, message: &Message) -> bool {
        message.source == self.source && self.mention.is_terminal(message)
    }
}

/// Terminates when any of its conditions does
#[derive(Debug, Clone, Default)]
pub struct AnyOf {
    conditions: Vec<TerminationHandle>,
}

impl AnyOf {
    pub fn new(conditions: Vec<TerminationHandle>) -> Self {
        Self { conditions }
    }

    /// Add another condition
    pub fn or(mut self, condition: impl TerminationCondition + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }
}

impl TerminationCondition for AnyOf {
    fn is_terminal(&self, message: &Message) -> bool {
        self.conditions.iter().any(|c| c.is_terminal(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MessageContent, ToolCall};

    fn text(source: &str, content: &str) -> Message {
        Message {
            source: source.to_string(),
            content: MessageContent::Text(content.to_string()),
            sequence: 1,
        }
    }

    #[test]
    fn test_marker_inside_longer_message() {
        let cond = TextMention::new("TERMINATE");
        assert!(cond.is_terminal(&text("a", "saved. TERMINATE")));
        assert!(cond.is_terminal(&text("a", "I will not TERMINATE yet")));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let cond = TextMention::new("TERMINATE");
        assert!(!cond.is_terminal(&text("a", "terminate")));
        assert!(!cond.is_terminal(&text("a", "TERMINAT")));
    }

    #[test]
    fn test_tool_content_never_matches() {
        let cond = TextMention::new("TERMINATE");
        let msg = Message {
            source: "a".into(),
            content: MessageContent::ToolCall(ToolCall::new(
                "echo",
                serde_json::json!({"text": "TERMINATE"}),
            )),
            sequence: 1,
        };
        assert!(!cond.is_terminal(&msg));
    }

    #[test]
    fn test_source_mention() {
        let cond = SourceMention::new("critic", "APPROVE");
        assert!(cond.is_terminal(&text("critic", "APPROVE")));
        assert!(!cond.is_terminal(&text("writer", "APPROVE")));
    }

    #[test]
    fn test_any_of() {
        let cond = AnyOf::default()
            .or(TextMention::new("TERMINATE"))
            .or(SourceMention::new("critic", "APPROVE"));
        assert!(cond.is_terminal(&text("writer", "done TERMINATE")));
        assert!(cond.is_terminal(&text("critic", "APPROVE")));
        assert!(!cond.is_terminal(&text("writer", "APPROVE")));
        assert!(!AnyOf::default().is_terminal(&text("a", "TERMINATE")));
    }
}
