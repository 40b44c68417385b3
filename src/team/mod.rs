//! Team module - turn-based multi-participant orchestration
//!
//! Contains the run history, the participant contract and its variants,
//! termination conditions, and the round-robin orchestrator.

pub mod assistant;
pub mod context;
pub mod history;
pub mod orchestrator;
pub mod participant;
pub mod result;
pub mod state;
pub mod termination;

pub use assistant::AssistantParticipant;
pub use context::TurnContext;
pub use history::History;
pub use orchestrator::{ParticipantHandle, RoundRobinTeam, RoundRobinTeamBuilder};
pub use participant::{Participant, ScriptedParticipant, ToolParticipant};
pub use result::{RunResult, RunStatus};
pub use state::RunState;
pub use termination::{AnyOf, SourceMention, TerminationCondition, TerminationHandle, TextMention};
