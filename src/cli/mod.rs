//! CLI module - command-line interface
//!
//! Contains the subcommand handlers and transcript rendering.

pub mod commands;
pub mod render;

pub use commands::RunOptions;
