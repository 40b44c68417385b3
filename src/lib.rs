//! Roundtable - turn-based multi-agent pipelines
//!
//! A fixed list of participants takes turns answering a task, optionally
//! calling tools, until a termination marker appears, the turn budget runs
//! out, or the run is cancelled.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Tools**: Tool registry and built-in remote and local tools
//! - **LLM**: Chat model abstraction with an OpenAI-compatible client
//! - **Team**: History, participants, termination, and the round-robin orchestrator
//! - **Pipeline**: TOML pipeline files resolved into a team
//! - **CLI**: Subcommand handlers and transcript rendering
//!
//! # Usage
//!
//! ```rust,no_run
//! use roundtable::team::{RoundRobinTeam, RunStatus, ScriptedParticipant};
//!
//! #[tokio::main]
//! async fn main() -> roundtable::Result<()> {
//!     let team = RoundRobinTeam::builder()
//!         .participant(ScriptedParticipant::new("writer", ["Draft ready"]))
//!         .participant(ScriptedParticipant::new("reviewer", ["Approved. TERMINATE"]))
//!         .marker("TERMINATE")
//!         .max_turns(6)
//!         .build()?;
//!
//!     let result = team.run("Write a haiku about Rust").await;
//!     assert_eq!(result.status, RunStatus::Completed);
//!     println!("{:?}", result.final_text());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod llm;
pub mod pipeline;
pub mod team;
pub mod tools;

// Re-export commonly used items
pub use core::{Config, Result, RoundtableError};
pub use pipeline::PipelineSpec;
pub use team::{RoundRobinTeam, RunResult, RunStatus};
pub use tools::ToolRegistry;
