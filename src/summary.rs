//! Run summary (`--summary <path>`)
//!
//! A JSON record of one action run: what was executed, which build it
//! produced, how the wait ended and which config layers were in effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::ConfigSource;

/// Schema version for the run summary
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the run summary
pub const RUN_SUMMARY_SCHEMA_ID: &str = "qwak-build/run_summary@1";

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    BuildFailed,
    TimedOut,
    /// Build CLI could not be started or exited non-zero
    CommandFailed,
    BuildIdNotFound,
    /// Status query or output error
    Error,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Succeeded => ExitCode::Success,
            _ => ExitCode::Failure,
        }
    }
}

/// Run summary document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub schema_id: String,

    /// Unique id of this action run
    pub run_id: String,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,

    pub outcome: Outcome,
    pub exit_code: i32,

    /// Rendered build command (absent for `wait`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,

    /// Final status name, `TIMEOUT` for a timed-out wait
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_status: Option<String>,

    /// Metrics of a successful build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,

    /// Distinct statuses seen while waiting, in order
    pub observed_statuses: Vec<String>,

    /// Error message for non-build failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub config_sources: Vec<ConfigSource>,

    pub human_summary: String,
}

impl RunSummary {
    /// Start a summary; fill in fields, then call [`RunSummary::finish`]
    pub fn begin(started_at: DateTime<Utc>, config_sources: Vec<ConfigSource>) -> Self {
        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            run_id: ulid::Ulid::new().to_string(),
            started_at,
            finished_at: started_at,
            duration_ms: 0,
            outcome: Outcome::Error,
            exit_code: ExitCode::Failure.as_i32(),
            command: None,
            build_id: None,
            build_status: None,
            metrics: None,
            observed_statuses: Vec::new(),
            error: None,
            config_sources,
            human_summary: String::new(),
        }
    }

    /// Stamp the outcome and finish time
    pub fn finish(mut self, outcome: Outcome) -> Self {
        let now = Utc::now();
        self.finished_at = now;
        self.duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        self.outcome = outcome;
        self.exit_code = outcome.exit_code().as_i32();
        self.human_summary = self.generate_human_summary();
        self
    }

    fn generate_human_summary(&self) -> String {
        let build = self.build_id.as_deref().unwrap_or("<unknown>");
        match self.outcome {
            Outcome::Succeeded => format!("Build {} succeeded", build),
            Outcome::BuildFailed => format!(
                "Build {} failed with status {}",
                build,
                self.build_status.as_deref().unwrap_or("<unknown>")
            ),
            Outcome::TimedOut => format!("Waiting for build {} timed out", build),
            Outcome::CommandFailed => "Build command failed".to_string(),
            Outcome::BuildIdNotFound => "Build ID not found in the command output".to_string(),
            Outcome::Error => format!(
                "Run failed: {}",
                self.error.as_deref().unwrap_or("unexpected error")
            ),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}
