//! Status client backed by the Qwak CLI

use std::process::{Command, Stdio};

use super::{BuildStatusClient, ClientError};
use crate::status::BuildSnapshot;

/// Placeholder replaced by the build id in the command template
pub const BUILD_ID_PLACEHOLDER: &str = "{build_id}";

/// Runs a status command per query and parses a JSON snapshot from stdout
///
/// The template is split on whitespace and executed without a shell, so an
/// id can never inject extra arguments. Quotes are not interpreted.
///
/// Expected output:
/// `{"build_id": "...", "build_status": "IN_PROGRESS", "metrics": {...}}`
#[derive(Debug, Clone)]
pub struct CliStatusClient {
    template: Vec<String>,
}

impl CliStatusClient {
    /// Create a client from a command template such as
    /// `qwak models builds status --build-id {build_id} --format json`
    pub fn new(template: &str) -> Self {
        Self {
            template: template.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Argument vector for one query, program first
    pub fn command_for(&self, build_id: &str) -> Vec<String> {
        self.template
            .iter()
            .map(|part| part.replace(BUILD_ID_PLACEHOLDER, build_id))
            .collect()
    }

    /// Parse the command's stdout into a snapshot
    pub fn parse_response(build_id: &str, stdout: &[u8]) -> Result<BuildSnapshot, ClientError> {
        let snapshot: BuildSnapshot = serde_json::from_slice(stdout)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        if snapshot.build_id != build_id {
            return Err(ClientError::BuildMismatch {
                expected: build_id.to_string(),
                actual: snapshot.build_id,
            });
        }

        Ok(snapshot)
    }
}

impl BuildStatusClient for CliStatusClient {
    fn get_build(&self, build_id: &str) -> Result<BuildSnapshot, ClientError> {
        let argv = self.command_for(build_id);
        let Some((program, args)) = argv.split_first() else {
            return Err(ClientError::Query("empty status command".to_string()));
        };
        tracing::debug!(build_id, command = %argv.join(" "), "querying build status");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ClientError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ClientError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Self::parse_response(build_id, &output.stdout)
    }
}
