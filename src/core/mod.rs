//! Core module - shared infrastructure for Roundtable
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{ParticipantError, ParticipantTurnError, Result, RoundtableError, ToolError};
pub use types::*;
