//! CI environment file output
//!
//! Appends `key=value` lines to the file named by `GITHUB_ENV` so later
//! pipeline steps can read the build result.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::poller::PollOutcome;

pub const BUILD_ID_KEY: &str = "build-id";
pub const BUILD_STATUS_KEY: &str = "build-status";
pub const BUILD_METRICS_KEY: &str = "build-metrics";

/// Env file errors
#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("no CI environment file configured (set GITHUB_ENV or pass --env-file)")]
    NotConfigured,

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode build metrics: {0}")]
    Metrics(#[from] serde_json::Error),

    #[error("refusing to export {key}: value contains a line break ({value:?})")]
    UnsafeValue { key: String, value: String },
}

/// Entries to export for a finished wait
///
/// Metrics are exported only for a successful build, as compact JSON.
pub fn outcome_entries(outcome: &PollOutcome) -> Result<Vec<(&'static str, String)>, EnvFileError> {
    let mut entries = vec![
        (BUILD_ID_KEY, outcome.build_id().to_string()),
        (BUILD_STATUS_KEY, outcome.status_name().to_string()),
    ];

    if let PollOutcome::Succeeded(snapshot) = outcome {
        entries.push((BUILD_METRICS_KEY, serde_json::to_string(&snapshot.metrics)?));
    }

    Ok(entries)
}

/// Reject entries that would spill onto extra env file lines
pub fn check_entries(entries: &[(&str, String)]) -> Result<(), EnvFileError> {
    for (key, value) in entries {
        if key.contains(['\n', '\r', '=']) || value.contains(['\n', '\r']) {
            return Err(EnvFileError::UnsafeValue {
                key: key.to_string(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Render entries as env file lines, each terminated by a newline
pub fn render_entries(entries: &[(&str, String)]) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect()
}

/// Append-only writer for the CI environment file
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writer for the configured path, if any
    pub fn from_config(path: Option<&Path>) -> Result<Self, EnvFileError> {
        path.map(Self::new).ok_or(EnvFileError::NotConfigured)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append entries in one write; the file is created if missing
    ///
    /// Nothing is written when any entry fails [`check_entries`].
    pub fn append(&self, entries: &[(&str, String)]) -> Result<(), EnvFileError> {
        check_entries(entries)?;

        let write_err = |source| EnvFileError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;

        file.write_all(render_entries(entries).as_bytes())
            .map_err(write_err)?;

        Ok(())
    }

    /// Export the result of a finished wait
    pub fn write_outcome(&self, outcome: &PollOutcome) -> Result<(), EnvFileError> {
        self.append(&outcome_entries(outcome)?)
    }
}
