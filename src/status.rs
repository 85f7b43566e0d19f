//! Remote build status model
//!
//! The status enumeration is owned by the Qwak build service. This crate only
//! reads snapshots of it and partitions the values into in-progress, success
//! and everything else.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Build status as reported by the build service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildStatus {
    Invalid,
    InProgress,
    Successful,
    Failed,
    RemoteBuildInitializing,
    RemoteBuildCancelled,
    RemoteBuildTimedOut,
    RemoteBuildUnknown,
    /// A value this crate does not know about. Treated as a terminal failure.
    Other(String),
}

impl BuildStatus {
    /// Wire name of the status (e.g. `IN_PROGRESS`)
    pub fn name(&self) -> &str {
        match self {
            BuildStatus::Invalid => "INVALID",
            BuildStatus::InProgress => "IN_PROGRESS",
            BuildStatus::Successful => "SUCCESSFUL",
            BuildStatus::Failed => "FAILED",
            BuildStatus::RemoteBuildInitializing => "REMOTE_BUILD_INITIALIZING",
            BuildStatus::RemoteBuildCancelled => "REMOTE_BUILD_CANCELLED",
            BuildStatus::RemoteBuildTimedOut => "REMOTE_BUILD_TIMED_OUT",
            BuildStatus::RemoteBuildUnknown => "REMOTE_BUILD_UNKNOWN",
            BuildStatus::Other(name) => name.as_str(),
        }
    }

    /// Parse a wire name. Never fails: unknown names map to `Other`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "INVALID" => BuildStatus::Invalid,
            "IN_PROGRESS" => BuildStatus::InProgress,
            "SUCCESSFUL" => BuildStatus::Successful,
            "FAILED" => BuildStatus::Failed,
            "REMOTE_BUILD_INITIALIZING" => BuildStatus::RemoteBuildInitializing,
            "REMOTE_BUILD_CANCELLED" => BuildStatus::RemoteBuildCancelled,
            "REMOTE_BUILD_TIMED_OUT" => BuildStatus::RemoteBuildTimedOut,
            "REMOTE_BUILD_UNKNOWN" => BuildStatus::RemoteBuildUnknown,
            _ => BuildStatus::Other(name.trim().to_string()),
        }
    }

    /// Build is still running (initializing or in progress)
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            BuildStatus::InProgress | BuildStatus::RemoteBuildInitializing
        )
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, BuildStatus::Successful)
    }

    /// Any status outside the in-progress allow-list is terminal
    pub fn is_terminal(&self) -> bool {
        !self.is_in_progress()
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for BuildStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for BuildStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BuildStatus::from_name(&name))
    }
}

/// Point-in-time view of a remote build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    pub build_id: String,

    #[serde(alias = "status")]
    pub build_status: BuildStatus,

    /// Opaque metrics payload, only meaningful once the build succeeded
    #[serde(default)]
    pub metrics: serde_json::Value,
}

impl BuildSnapshot {
    pub fn new(build_id: impl Into<String>, build_status: BuildStatus) -> Self {
        Self {
            build_id: build_id.into(),
            build_status,
            metrics: serde_json::Value::Null,
        }
    }

    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = metrics;
        self
    }
}
