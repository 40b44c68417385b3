//! Run transcript
//!
//! The history is append-only: messages are never edited, removed, or
//! reordered once added, and their index is their sequence number.

use crate::core::{Message, MessageContent, USER_SOURCE};

/// Ordered transcript of a single run
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Start a history with the task as the seed message
    pub fn seeded(task: impl Into<String>) -> Self {
        let mut history = Self::default();
        history.append(USER_SOURCE, MessageContent::Text(task.into()));
        history
    }

    /// Append a message and return it
    pub fn append(&mut self, source: impl Into<String>, content: MessageContent) -> &Message {
        let sequence = self.messages.len();
        self.messages.push(Message {
            source: source.into(),
            content,
            sequence,
        });
        &self.messages[sequence]
    }

    /// Append a text message
    pub fn append_text(&mut self, source: impl Into<String>, text: impl Into<String>) -> &Message {
        self.append(source, MessageContent::Text(text.into()))
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The seeded task, if any
    pub fn task(&self) -> Option<&str> {
        self.messages.first().and_then(Message::text)
    }

    /// Most recent text message
    pub fn last_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(Message::text)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Hand the transcript over to a run result
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
