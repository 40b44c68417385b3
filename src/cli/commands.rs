//! CLI commands
//!
//! Handlers behind the `roundtable` subcommands. Each returns the text to
//! print so `main` stays a thin dispatcher.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::cli::render::{render_json, render_transcript};
use crate::core::{Config, Result, RoundtableError};
use crate::llm::{LLMProvider, OpenAiClient};
use crate::pipeline::PipelineSpec;
use crate::team::RunResult;

/// Options for `roundtable run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub pipeline: PathBuf,
    pub task: Option<String>,
    pub max_turns: Option<usize>,
    pub marker: Option<String>,
    pub json: bool,
}

/// Load a pipeline and apply command-line overrides
fn load_pipeline(options: &RunOptions) -> Result<PipelineSpec> {
    let mut spec = PipelineSpec::from_file(&options.pipeline)?;
    if options.max_turns.is_some() {
        spec.max_turns = options.max_turns;
    }
    if options.marker.is_some() {
        spec.marker = options.marker.clone();
    }
    Ok(spec)
}

/// Run a pipeline until it completes, exhausts its budget, or is cancelled
pub async fn run(
    options: &RunOptions,
    config: &Config,
    cancel: CancellationToken,
) -> Result<RunResult> {
    let spec = load_pipeline(options)?;
    let task = options
        .task
        .clone()
        .or_else(|| spec.task.clone())
        .ok_or_else(|| {
            RoundtableError::config("no task given; pass --task or set `task` in the pipeline")
        })?;

    let team = spec.build(config).await?;
    Ok(team.run_with_cancel(task, cancel).await)
}

/// Render a finished run for the terminal
pub fn format_result(result: &RunResult, json: bool) -> Result<String> {
    if json {
        Ok(render_json(result)?)
    } else {
        Ok(render_transcript(result))
    }
}

/// Resolve a pipeline without running it
pub async fn validate(path: &Path, config: &Config) -> Result<String> {
    let spec = PipelineSpec::from_file(path)?;
    let team = spec.build(config).await?;
    let tools = team.tools().names().join(", ");

    Ok(format!(
        "{} is valid\n  Participants: {}\n  Tools:        {}\n  Max turns:    {}",
        path.display(),
        team.participant_ids().join(" -> "),
        if tools.is_empty() { "(none)" } else { tools.as_str() },
        team.max_turns()
    ))
}

/// List the models the configured endpoint offers
pub async fn models(config: &Config) -> Result<String> {
    let client = OpenAiClient::from_config(config)?;
    let models = client.list_models().await?;

    Ok(format!(
        "Available models at {}:\n{}\n\nCurrent: {}",
        config.model.base_url,
        models
            .iter()
            .map(|m| format!("  - {}", m))
            .collect::<Vec<_>>()
            .join("\n"),
        config.model.model
    ))
}

/// Show the active configuration, optionally writing it to disk first
pub fn show_config(config: &Config, init: bool) -> Result<String> {
    if init {
        if Config::config_exists() {
            return Ok(format!(
                "Config already exists at {}",
                Config::config_file().display()
            ));
        }
        let path = config.save()?;
        return Ok(format!("Wrote {}", path.display()));
    }

    Ok(format!(
        "# {}\n{}",
        Config::config_file().display(),
        config.to_toml()
    ))
}
