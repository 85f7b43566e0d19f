//! Build status clients
//!
//! Abstracts the remote build-status service for testability:
//! - [`BuildStatusClient`]: query a build by id
//! - [`CliStatusClient`]: shells out to the Qwak CLI and parses its JSON
//! - [`ScriptedStatusClient`]: replays a fixed status sequence in-process

mod cli;
mod scripted;

pub use cli::CliStatusClient;
pub use scripted::ScriptedStatusClient;

use std::io;

use crate::status::BuildSnapshot;

/// Query interface of the build-status service
pub trait BuildStatusClient {
    /// Fetch the current snapshot of a build
    fn get_build(&self, build_id: &str) -> Result<BuildSnapshot, ClientError>;
}

impl<C: BuildStatusClient + ?Sized> BuildStatusClient for &C {
    fn get_build(&self, build_id: &str) -> Result<BuildSnapshot, ClientError> {
        (**self).get_build(build_id)
    }
}

impl<C: BuildStatusClient + ?Sized> BuildStatusClient for Box<C> {
    fn get_build(&self, build_id: &str) -> Result<BuildSnapshot, ClientError> {
        (**self).get_build(build_id)
    }
}

/// Status query errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to spawn status command `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("status command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("invalid status response: {0}")]
    InvalidResponse(String),

    #[error("status response is for build {actual}, expected {expected}")]
    BuildMismatch { expected: String, actual: String },

    #[error("status query failed: {0}")]
    Query(String),
}
