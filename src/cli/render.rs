//! Transcript rendering

use crate::core::Message;
use crate::team::RunResult;

/// One line per message, prefixed with its sequence and source
pub fn render_message(message: &Message) -> String {
    format!(
        "[{}] {}: {}",
        message.sequence,
        message.source,
        message.content.render()
    )
}

/// Human-readable transcript followed by a status line
pub fn render_transcript(result: &RunResult) -> String {
    let mut output = String::new();
    for message in &result.messages {
        output.push_str(&render_message(message));
        output.push('\n');
    }
    output.push_str(&format!(
        "─────────────────────────────\nRun {} after {} of {} turn(s)\n",
        result.status, result.turns, result.max_turns
    ));
    output
}

/// Pretty JSON for `--json`
pub fn render_json(result: &RunResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}
