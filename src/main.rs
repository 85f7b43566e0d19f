//! qwak-build CLI
//!
//! Entry point for the `qwak-build` CI step.

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use qwak_build_action::summary::Outcome;
use qwak_build_action::{
    extract_build_id, is_build_id, BuildCommand, CliStatusClient, EffectiveConfig, Pipeline, PipelineResult,
    ProcessRunner, RunReport, RunSummary,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qwak-build")]
#[command(about = "Build a Qwak model and wait for the remote build", version)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalOptions {
    /// Path to a TOML config file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// CI environment file to append outputs to (default: $GITHUB_ENV)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Minutes to wait for the remote build (default: $INPUT_TIMEOUT_AFTER or 30)
    #[arg(long, global = true)]
    timeout_minutes: Option<u64>,

    /// Seconds between status queries (default: 10)
    #[arg(long, global = true)]
    poll_interval_secs: Option<u64>,

    /// Write a JSON run summary to this path
    #[arg(long, global = true)]
    summary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the model and wait for the remote build (default)
    Run,

    /// Print the build command without running it
    Command,

    /// Wait for an existing build and export its result
    Wait {
        /// Build id to wait for
        #[arg(value_parser = parse_build_id)]
        build_id: String,
    },

    /// Extract the build id from captured `qwak models build` output
    Extract {
        /// File with the captured output (default: stdin)
        file: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_action(&cli.options),
        Commands::Command => run_command(&cli.options),
        Commands::Wait { build_id } => run_wait(&cli.options, &build_id),
        Commands::Extract { file } => run_extract(file.as_deref()),
    }
}

fn parse_build_id(value: &str) -> Result<String, String> {
    if is_build_id(value) {
        Ok(value.to_string())
    } else {
        Err("expected hex digits and dashes".to_string())
    }
}

fn run_action(options: &GlobalOptions) {
    let started_at = Utc::now();
    let effective = load_config(options);

    let mut pipeline = match build_pipeline(&effective) {
        Ok(p) => p,
        Err(e) => finish(options, &effective, started_at, None, None, Err(e)),
    };

    let result = pipeline.run();
    let command = pipeline.command().map(str::to_string);
    let build_id = pipeline.build_id().map(str::to_string);
    finish(options, &effective, started_at, command, build_id, result);
}

fn run_command(options: &GlobalOptions) {
    let effective = load_config(options);
    println!("{}", BuildCommand::from_config(&effective.config));
}

fn run_wait(options: &GlobalOptions, build_id: &str) {
    let started_at = Utc::now();
    let effective = load_config(options);

    let mut pipeline = match build_pipeline(&effective) {
        Ok(p) => p,
        Err(e) => finish(options, &effective, started_at, None, Some(build_id.to_string()), Err(e)),
    };

    let result = pipeline.wait(build_id);
    finish(options, &effective, started_at, None, Some(build_id.to_string()), result);
}

fn run_extract(file: Option<&Path>) {
    let output = match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };

    let output = match output {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error reading command output: {}", e);
            process::exit(1);
        }
    };

    match extract_build_id(&output) {
        Some(build_id) => println!("{}", build_id),
        None => {
            eprintln!("Build ID not found in the command output.");
            process::exit(1);
        }
    }
}

fn build_pipeline(
    effective: &EffectiveConfig,
) -> PipelineResult<Pipeline<ProcessRunner, CliStatusClient>> {
    Pipeline::new(
        effective.config.clone(),
        ProcessRunner,
        CliStatusClient::new(&effective.config.status_command),
    )
}

fn load_config(options: &GlobalOptions) -> EffectiveConfig {
    let mut overrides = serde_json::Map::new();
    if let Some(ref path) = options.env_file {
        overrides.insert("env_file".to_string(), path.to_string_lossy().into());
    }
    if let Some(minutes) = options.timeout_minutes {
        overrides.insert("timeout_minutes".to_string(), minutes.into());
    }
    if let Some(secs) = options.poll_interval_secs {
        overrides.insert("poll_interval_secs".to_string(), secs.into());
    }

    let cli_overrides = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    match EffectiveConfig::from_process_env(options.config.as_deref(), cli_overrides) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

/// Log the result, write the optional summary and exit
fn finish(
    options: &GlobalOptions,
    effective: &EffectiveConfig,
    started_at: chrono::DateTime<Utc>,
    command: Option<String>,
    build_id: Option<String>,
    result: PipelineResult<RunReport>,
) -> ! {
    let mut summary = RunSummary::begin(started_at, effective.sources.clone());
    summary.command = command;
    summary.build_id = build_id;

    let outcome = match result {
        Ok(report) => {
            summary.build_status = Some(report.outcome.status_name().to_string());
            summary.observed_statuses = report
                .observed_statuses
                .iter()
                .map(|s| s.name().to_string())
                .collect();
            if report.outcome.is_success() {
                summary.metrics = report.outcome.snapshot().map(|s| s.metrics.clone());
            }
            report.summary_outcome()
        }
        Err(e) => {
            tracing::error!("{}", e);
            summary.error = Some(e.to_string());
            e.outcome()
        }
    };

    let summary = summary.finish(outcome);
    if let Some(ref path) = options.summary {
        if let Err(e) = summary.write_to_file(path) {
            tracing::warn!("Could not write run summary to {}: {}", path.display(), e);
        }
    }

    if outcome == Outcome::Succeeded {
        tracing::info!("{}", summary.human_summary);
    }
    process::exit(summary.exit_code);
}
