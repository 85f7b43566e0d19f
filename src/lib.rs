//! Qwak model build step for CI pipelines
//!
//! Runs `qwak models build` with options taken from the environment, recovers
//! the build id from the CLI output, waits for the remote build to finish and
//! exports `build-id`, `build-status` and `build-metrics` to the CI
//! environment file for later steps.

pub mod client;
pub mod command;
pub mod config;
pub mod env_file;
pub mod extract;
pub mod pipeline;
pub mod poller;
pub mod runner;
pub mod status;
pub mod summary;

pub use client::{BuildStatusClient, ClientError, CliStatusClient, ScriptedStatusClient};
pub use command::BuildCommand;
pub use config::{ActionConfig, ConfigError, EffectiveConfig};
pub use env_file::{EnvFile, EnvFileError};
pub use extract::{extract_build_id, is_build_id};
pub use pipeline::{Pipeline, PipelineError, PipelineResult, RunReport};
pub use poller::{PollOutcome, PollerConfig, StatusPoller};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, RunnerError};
pub use status::{BuildSnapshot, BuildStatus};
pub use summary::{ExitCode, Outcome, RunSummary};
