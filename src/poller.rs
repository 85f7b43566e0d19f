//! Bounded status polling for a remote build
//!
//! Each tick sleeps the poll interval, then queries the status client:
//! - `SUCCESSFUL` ends the wait with [`PollOutcome::Succeeded`]
//! - `IN_PROGRESS` / `REMOTE_BUILD_INITIALIZING` keep polling
//! - anything else, including statuses this crate does not know, ends the
//!   wait with [`PollOutcome::Failed`]
//!
//! When the overall deadline passes first the result is
//! [`PollOutcome::TimedOut`]. Query errors are returned as-is; only
//! in-progress statuses are retried.

use std::thread;
use std::time::{Duration, Instant};

use crate::client::{BuildStatusClient, ClientError};
use crate::config::ActionConfig;
use crate::status::{BuildSnapshot, BuildStatus};

/// Status written to the env file when the wait times out
pub const TIMEOUT_STATUS: &str = "TIMEOUT";

/// Poller timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay before every status query (default: 10s)
    pub poll_interval: Duration,

    /// Overall deadline measured from the start of the wait (default: 30 min)
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl PollerConfig {
    pub fn from_config(config: &ActionConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
        }
    }
}

/// How the wait ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(BuildSnapshot),
    /// Terminal status other than `SUCCESSFUL`
    Failed(BuildSnapshot),
    /// Deadline passed without a terminal status
    TimedOut { build_id: String, elapsed: Duration },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Succeeded(_))
    }

    pub fn build_id(&self) -> &str {
        match self {
            PollOutcome::Succeeded(snapshot) | PollOutcome::Failed(snapshot) => &snapshot.build_id,
            PollOutcome::TimedOut { build_id, .. } => build_id,
        }
    }

    /// Status name to report, `TIMEOUT` for a timed-out wait
    pub fn status_name(&self) -> &str {
        match self {
            PollOutcome::Succeeded(snapshot) | PollOutcome::Failed(snapshot) => {
                snapshot.build_status.name()
            }
            PollOutcome::TimedOut { .. } => TIMEOUT_STATUS,
        }
    }

    pub fn snapshot(&self) -> Option<&BuildSnapshot> {
        match self {
            PollOutcome::Succeeded(snapshot) | PollOutcome::Failed(snapshot) => Some(snapshot),
            PollOutcome::TimedOut { .. } => None,
        }
    }
}

/// Waits for one build to reach a terminal status
#[derive(Debug)]
pub struct StatusPoller<C> {
    client: C,
    config: PollerConfig,

    /// Distinct consecutive statuses seen during the last wait
    observed: Vec<BuildStatus>,

    polls: usize,
}

impl<C: BuildStatusClient> StatusPoller<C> {
    pub fn new(client: C, config: PollerConfig) -> Self {
        Self {
            client,
            config,
            observed: Vec::new(),
            polls: 0,
        }
    }

    /// Poll until a terminal status or the deadline
    pub fn wait(&mut self, build_id: &str) -> Result<PollOutcome, ClientError> {
        self.observed.clear();
        self.polls = 0;

        let start = Instant::now();

        while start.elapsed() < self.config.timeout {
            thread::sleep(self.config.poll_interval);

            let snapshot = match self.client.get_build(build_id) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(build_id, error = %e, "status query failed");
                    return Err(e);
                }
            };
            self.polls += 1;
            self.record(build_id, &snapshot.build_status);

            if snapshot.build_status.is_successful() {
                let elapsed = start.elapsed();
                tracing::info!(
                    build_id,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Build finished after {} with status {}",
                    format_elapsed(elapsed),
                    snapshot.build_status
                );
                return Ok(PollOutcome::Succeeded(snapshot));
            }

            if snapshot.build_status.is_terminal() {
                tracing::warn!(
                    build_id,
                    status = %snapshot.build_status,
                    "Build failed with status {} -> check the build logs in the Qwak dashboard",
                    snapshot.build_status
                );
                return Ok(PollOutcome::Failed(snapshot));
            }
        }

        let elapsed = start.elapsed();
        tracing::warn!(
            build_id,
            elapsed_secs = elapsed.as_secs_f64(),
            "Build {} timed out after {} minutes",
            build_id,
            self.config.timeout.as_secs() / 60
        );
        Ok(PollOutcome::TimedOut {
            build_id: build_id.to_string(),
            elapsed,
        })
    }

    /// Statuses seen during the last wait, consecutive duplicates collapsed
    pub fn observed_statuses(&self) -> &[BuildStatus] {
        &self.observed
    }

    /// Status queries issued during the last wait
    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    fn record(&mut self, build_id: &str, status: &BuildStatus) {
        if self.observed.last() != Some(status) {
            tracing::info!(build_id, status = %status, "Current build {} status is: {}", build_id, status);
            self.observed.push(status.clone());
        }
    }
}

/// `"3 minutes and 12.50 seconds"`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let minutes = (total / 60.0).floor();
    let seconds = total - minutes * 60.0;
    format!("{} minutes and {:.2} seconds", minutes as u64, seconds)
}
