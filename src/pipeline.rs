//! Action pipeline
//!
//! Ties the pieces together:
//! 1. Build the `qwak models build` command from config
//! 2. Run it and capture its output
//! 3. Extract the build id from stdout
//! 4. Poll the build status until terminal or timeout
//! 5. Export the result to the CI environment file
//!
//! A finished wait (success, failure or timeout) is returned as a
//! [`RunReport`]; everything that prevents reaching a finished wait is a
//! [`PipelineError`].

use thiserror::Error;

use crate::client::{BuildStatusClient, ClientError};
use crate::command::BuildCommand;
use crate::config::ActionConfig;
use crate::env_file::{EnvFile, EnvFileError};
use crate::extract::extract_build_id;
use crate::poller::{PollOutcome, PollerConfig, StatusPoller};
use crate::runner::{CommandRunner, RunnerError};
use crate::status::BuildStatus;
use crate::summary::{ExitCode, Outcome};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Runner(#[from] RunnerError),

    #[error("`qwak models build` failed (exit code {}): {stderr}", describe_exit(.exit_code))]
    CommandFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Build ID not found in the command output")]
    BuildIdNotFound,

    #[error("error while waiting for build {build_id}: {source}")]
    StatusQuery {
        build_id: String,
        #[source]
        source: ClientError,
    },

    #[error("{0}")]
    EnvFile(#[from] EnvFileError),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        self.outcome().exit_code()
    }

    /// Summary outcome for this error
    pub fn outcome(&self) -> Outcome {
        match self {
            PipelineError::Runner(_) | PipelineError::CommandFailed { .. } => {
                Outcome::CommandFailed
            }
            PipelineError::BuildIdNotFound => Outcome::BuildIdNotFound,
            PipelineError::StatusQuery { .. }
            | PipelineError::EnvFile(_) => Outcome::Error,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => code.to_string(),
        None => "none, killed by signal".to_string(),
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result of a finished wait
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Rendered build command (absent when only waiting)
    pub command: Option<String>,

    pub outcome: PollOutcome,

    /// Distinct statuses seen while waiting
    pub observed_statuses: Vec<BuildStatus>,
}

impl RunReport {
    pub fn summary_outcome(&self) -> Outcome {
        match self.outcome {
            PollOutcome::Succeeded(_) => Outcome::Succeeded,
            PollOutcome::Failed(_) => Outcome::BuildFailed,
            PollOutcome::TimedOut { .. } => Outcome::TimedOut,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.summary_outcome().exit_code()
    }
}

/// One action run
pub struct Pipeline<R, C> {
    config: ActionConfig,
    runner: R,
    client: C,
    env_file: EnvFile,

    /// Rendered command, once built
    command: Option<String>,

    /// Build id, once extracted
    build_id: Option<String>,
}

impl<R: CommandRunner, C: BuildStatusClient> Pipeline<R, C> {
    /// Create a pipeline
    ///
    /// Fails up front when no env file is configured, before any build is
    /// started.
    pub fn new(config: ActionConfig, runner: R, client: C) -> PipelineResult<Self> {
        let env_file = EnvFile::from_config(config.env_file.as_deref())?;
        Ok(Self {
            config,
            runner,
            client,
            env_file,
            command: None,
            build_id: None,
        })
    }

    /// Build the model and wait for the remote build
    pub fn run(&mut self) -> PipelineResult<RunReport> {
        let command = BuildCommand::from_config(&self.config);
        let rendered = command.render();
        tracing::info!("Printing the qwak cli command for debug purposes: {}", rendered);
        self.command = Some(rendered);

        let output = self.runner.run(&command)?;
        tracing::info!("Command Output:\n\n{}\n", output.stdout);

        if !output.success() {
            tracing::error!(
                exit_code = ?output.exit_code,
                "An error occurred while running the `qwak models build` command.\n {}",
                output.stderr
            );
            return Err(PipelineError::CommandFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let build_id = extract_build_id(&output.stdout).ok_or_else(|| {
            tracing::error!("Build ID not found in the command output. Please contact the Qwak team for assistance.");
            PipelineError::BuildIdNotFound
        })?;
        tracing::info!(build_id = %build_id, "Extracted Build ID: {}", build_id);

        let mut report = self.wait(&build_id)?;
        report.command = self.command.clone();
        Ok(report)
    }

    /// Wait for an already-started build and export its result
    pub fn wait(&mut self, build_id: &str) -> PipelineResult<RunReport> {
        self.build_id = Some(build_id.to_string());

        let mut poller = StatusPoller::new(&self.client, PollerConfig::from_config(&self.config));
        let outcome = poller.wait(build_id).map_err(|source| PipelineError::StatusQuery {
            build_id: build_id.to_string(),
            source,
        })?;

        self.env_file.write_outcome(&outcome)?;

        match &outcome {
            PollOutcome::Succeeded(_) => {}
            PollOutcome::Failed(snapshot) => tracing::error!(
                build_id,
                status = %snapshot.build_status,
                "Build failed with status {}. Failing the step.",
                snapshot.build_status
            ),
            PollOutcome::TimedOut { .. } => tracing::error!(
                build_id,
                "Waiting for build {} timed out after {} minutes",
                build_id,
                self.config.timeout_minutes
            ),
        }

        Ok(RunReport {
            command: None,
            outcome,
            observed_statuses: poller.observed_statuses().to_vec(),
        })
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Rendered build command, once `run` has built it
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Build id, once known
    pub fn build_id(&self) -> Option<&str> {
        self.build_id.as_deref()
    }
}
