//! Round-robin team orchestrator
//!
//! Runs participants strictly one at a time in configuration order, wrapping
//! after the last. Each turn is raced against the run's cancellation token,
//! bounded by the turn timeout, and shielded from panics; failures become
//! ordinary transcript messages and the run keeps going.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{
    MessageContent, ParticipantError, ParticipantTurnError, Result, RoundtableError, ToolCall,
    ToolResult, USER_SOURCE,
};
use crate::team::context::TurnContext;
use crate::team::history::History;
use crate::team::participant::Participant;
use crate::team::result::{RunResult, RunStatus};
use crate::team::state::RunState;
use crate::team::termination::{AnyOf, TerminationCondition, TerminationHandle, TextMention};
use crate::tools::ToolRegistry;

/// Shared participant handle
pub type ParticipantHandle = Arc<dyn Participant>;

/// A configured team, ready to run tasks
///
/// Cloning is cheap; every run owns its own history, so clones may run
/// concurrently against the same tool registry.
#[derive(Clone)]
pub struct RoundRobinTeam {
    inner: Arc<TeamInner>,
}

struct TeamInner {
    participants: Vec<ParticipantHandle>,
    termination: TerminationHandle,
    max_turns: usize,
    turn_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    tools: Arc<ToolRegistry>,
}

/// How a single turn settled
enum TurnOutcome {
    /// The participant replied, or its failure was turned into a reply
    Settled {
        exchanges: Vec<(ToolCall, ToolResult)>,
        reply: String,
    },
    /// Cancellation was observed; nothing is appended
    Cancelled,
}

impl RoundRobinTeam {
    pub fn builder() -> RoundRobinTeamBuilder {
        RoundRobinTeamBuilder::default()
    }

    /// Participant ids in speaking order
    pub fn participant_ids(&self) -> Vec<&str> {
        self.inner.participants.iter().map(|p| p.id()).collect()
    }

    pub fn max_turns(&self) -> usize {
        self.inner.max_turns
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.inner.tools
    }

    /// Run a task to completion, exhaustion, or never-set cancellation
    pub async fn run(&self, task: impl Into<String>) -> RunResult {
        self.run_with_cancel(task, CancellationToken::new()).await
    }

    /// Run a task, stopping as soon as `cancel` is observed
    pub async fn run_with_cancel(
        &self,
        task: impl Into<String>,
        cancel: CancellationToken,
    ) -> RunResult {
        let inner = &self.inner;
        let mut history = History::seeded(task);
        let mut state = RunState::new(inner.max_turns);
        let count = inner.participants.len();

        info!(participants = count, max_turns = inner.max_turns, "run started");

        let status = loop {
            if cancel.is_cancelled() {
                break RunStatus::Cancelled;
            }
            if !state.has_budget() {
                break RunStatus::Exhausted;
            }

            let participant = inner.participants[state.speaker(count)].as_ref();
            debug!(turn = state.turn + 1, participant = %participant.id(), "turn started");

            let (exchanges, reply) = match self.play_turn(participant, &history, &cancel).await {
                TurnOutcome::Settled { exchanges, reply } => (exchanges, reply),
                TurnOutcome::Cancelled => break RunStatus::Cancelled,
            };
            if cancel.is_cancelled() {
                warn!(participant = %participant.id(), "discarding reply produced after cancellation");
                break RunStatus::Cancelled;
            }

            let source = participant.id();
            for (call, result) in exchanges {
                history.append(source, MessageContent::ToolCall(call));
                history.append(source, MessageContent::ToolResult(result));
            }
            let message = history.append_text(source, reply);
            state.next_turn();

            if inner.termination.is_terminal(message) {
                break RunStatus::Completed;
            }
        };

        info!(
            status = %status,
            turns = state.turn,
            messages = history.len(),
            "run finished"
        );

        RunResult {
            messages: history.into_messages(),
            status,
            turns: state.turn,
            max_turns: inner.max_turns,
        }
    }

    async fn play_turn(
        &self,
        participant: &dyn Participant,
        history: &History,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let id = participant.id();
        let mut ctx = TurnContext::new(
            id,
            participant.tools(),
            history,
            &self.inner.tools,
            cancel,
            self.inner.tool_timeout,
        );

        let outcome = {
            let turn = AssertUnwindSafe(participant.take_turn(&mut ctx)).catch_unwind();
            let bounded = async {
                match self.inner.turn_timeout {
                    Some(limit) => tokio::time::timeout(limit, turn).await.map_err(|_| limit),
                    None => Ok(turn.await),
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return TurnOutcome::Cancelled,
                outcome = bounded => outcome,
            }
        };

        let exchanges = ctx.into_exchanges();
        let reply = match outcome {
            Ok(Ok(Ok(reply))) => reply,
            Ok(Ok(Err(ParticipantError::Cancelled))) => return TurnOutcome::Cancelled,
            Ok(Ok(Err(e))) => {
                warn!(participant = %id, error = %e, "turn failed");
                ParticipantTurnError::new(id, e).to_string()
            }
            Ok(Err(panic)) => {
                let msg = panic_message(&panic);
                error!(participant = %id, panic = %msg, "participant panicked");
                ParticipantTurnError::new(id, format!("panicked: {}", msg)).to_string()
            }
            Err(limit) => {
                warn!(participant = %id, timeout_ms = limit.as_millis() as u64, "turn timed out");
                ParticipantTurnError::new(id, format!("timed out after {}ms", limit.as_millis()))
                    .to_string()
            }
        };

        TurnOutcome::Settled { exchanges, reply }
    }
}

impl std::fmt::Debug for RoundRobinTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinTeam")
            .field("participants", &self.participant_ids())
            .field("termination", &self.inner.termination)
            .field("max_turns", &self.inner.max_turns)
            .finish()
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}

/// Builder for [`RoundRobinTeam`]
pub struct RoundRobinTeamBuilder {
    participants: Vec<ParticipantHandle>,
    conditions: Vec<TerminationHandle>,
    markers: Vec<String>,
    max_turns: usize,
    turn_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    tools: Arc<ToolRegistry>,
}

impl Default for RoundRobinTeamBuilder {
    fn default() -> Self {
        Self {
            participants: Vec::new(),
            conditions: Vec::new(),
            markers: Vec::new(),
            max_turns: 10,
            turn_timeout: None,
            tool_timeout: None,
            tools: Arc::new(ToolRegistry::new()),
        }
    }
}

impl RoundRobinTeamBuilder {
    /// Add a participant; speaking order is insertion order
    pub fn participant(self, participant: impl Participant + 'static) -> Self {
        self.participant_handle(Arc::new(participant))
    }

    pub fn participant_handle(mut self, participant: ParticipantHandle) -> Self {
        self.participants.push(participant);
        self
    }

    /// Add a termination condition; any matching condition ends the run
    pub fn termination(mut self, condition: impl TerminationCondition + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    /// Terminate when a message contains `marker`
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        self.markers.push(marker.clone());
        self.termination(TextMention::new(marker))
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Registry the participants' tools are resolved against
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    fn check_participants(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for participant in self.participants.iter() {
            let id = participant.id();
            if id == USER_SOURCE {
                return Err(RoundtableError::config(format!(
                    "participant id '{}' is reserved for the task message",
                    USER_SOURCE
                )));
            }
            if !seen.insert(id) {
                return Err(RoundtableError::config(format!(
                    "duplicate participant id '{}'",
                    id
                )));
            }
            for tool in participant.tools() {
                if !self.tools.contains(tool) {
                    return Err(RoundtableError::config(format!(
                        "participant '{}' is bound to unregistered tool '{}'",
                        id, tool
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate the wiring and build the team
    pub fn build(self) -> Result<RoundRobinTeam> {
        if self.participants.is_empty() {
            return Err(RoundtableError::config("a team needs at least one participant"));
        }
        if self.max_turns == 0 {
            return Err(RoundtableError::config("max_turns must be at least 1"));
        }

        if self.markers.iter().any(|m| m.trim().is_empty()) {
            return Err(RoundtableError::config("termination marker must not be empty"));
        }

        self.check_participants()?;

        let mut conditions = self.conditions;
        let termination: TerminationHandle = match conditions.len() {
            0 => return Err(RoundtableError::config("a team needs a termination condition")),
            1 => conditions.remove(0),
            _ => Arc::new(AnyOf::new(conditions)),
        };

        Ok(RoundRobinTeam {
            inner: Arc::new(TeamInner {
                participants: self.participants,
                termination,
                max_turns: self.max_turns,
                turn_timeout: self.turn_timeout,
                tool_timeout: self.tool_timeout,
                tools: self.tools,
            }),
        })
    }
}
