//! Roundtable - turn-based multi-agent pipelines
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use roundtable::cli::commands;
use roundtable::cli::RunOptions;
use roundtable::team::RunStatus;
use roundtable::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Roundtable - turn-based multi-agent pipelines
#[derive(Parser, Debug)]
#[command(name = "roundtable")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a pipeline file
    Run {
        /// Path to the pipeline TOML file
        pipeline: PathBuf,

        /// Task for the team (overrides the pipeline's task)
        #[arg(long, short = 't')]
        task: Option<String>,

        /// Maximum number of turns
        #[arg(long)]
        max_turns: Option<usize>,

        /// Termination marker
        #[arg(long)]
        marker: Option<String>,

        /// Print the run result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that a pipeline file resolves without running it
    Validate {
        /// Path to the pipeline TOML file
        pipeline: PathBuf,
    },
    /// List models offered by the configured endpoint
    Models,
    /// Show the configuration
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("roundtable=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roundtable=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load();
    if args.debug {
        config.debug = true;
    }
    init_tracing(config.debug);

    match args.command {
        Command::Run {
            pipeline,
            task,
            max_turns,
            marker,
            json,
        } => {
            let options = RunOptions {
                pipeline,
                task,
                max_turns,
                marker,
                json,
            };

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\nCancelling run...");
                    trigger.cancel();
                }
            });

            let result = commands::run(&options, &config, cancel).await?;
            println!("{}", commands::format_result(&result, options.json)?);

            Ok(match result.status {
                RunStatus::Completed => ExitCode::SUCCESS,
                RunStatus::Exhausted => ExitCode::from(2),
                RunStatus::Cancelled => ExitCode::from(130),
            })
        }
        Command::Validate { pipeline } => {
            println!("{}", commands::validate(&pipeline, &config).await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Models => {
            println!("{}", commands::models(&config).await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { init } => {
            println!("{}", commands::show_config(&config, init)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
