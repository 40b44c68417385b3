//! Run results

use serde::Serialize;

use crate::core::{Message, Result, RoundtableError};

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// A termination condition matched
    Completed,
    /// The cancellation token was set
    Cancelled,
    /// The turn budget ran out
    Exhausted,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Exhausted => "exhausted",
        };
        f.write_str(label)
    }
}

/// Snapshot of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// The full transcript, seed task first
    pub messages: Vec<Message>,
    pub status: RunStatus,
    /// Turns taken
    pub turns: usize,
    /// The turn budget the run had
    pub max_turns: usize,
}

impl RunResult {
    /// The last message in the transcript
    pub fn final_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the most recent text message
    pub fn final_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(Message::text)
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Treat anything but completion as an error
    pub fn into_completed(self) -> Result<RunResult> {
        match self.status {
            RunStatus::Completed => Ok(self),
            RunStatus::Cancelled => Err(RoundtableError::CancellationRequested),
            RunStatus::Exhausted => Err(RoundtableError::TurnBudgetExhausted {
                max_turns: self.max_turns,
            }),
        }
    }
}
