//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Status query used when none is configured
pub const DEFAULT_STATUS_COMMAND: &str = "qwak models builds status --build-id {build_id} --format json";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Minutes to wait for the remote build (default: 30)
    pub timeout_minutes: u64,

    /// Seconds between status queries (default: 10)
    pub poll_interval_secs: u64,

    /// Pass `--json-logs` to the build CLI (default: true)
    pub logs_as_json: bool,

    /// Build CLI executable (default: "qwak")
    pub cli_path: String,

    /// Status query template, `{build_id}` is substituted
    ///
    /// Split on whitespace with no quoting: a program path or argument
    /// containing spaces cannot be expressed. Point it at a wrapper script
    /// instead.
    pub status_command: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            timeout_minutes: 30,
            poll_interval_secs: 10,
            logs_as_json: true,
            cli_path: "qwak".to_string(),
            status_command: DEFAULT_STATUS_COMMAND.to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "timeout_minutes": self.timeout_minutes,
            "poll_interval_secs": self.poll_interval_secs,
            "logs_as_json": self.logs_as_json,
            "cli_path": self.cli_path,
            "status_command": self.status_command,
        })
    }
}
