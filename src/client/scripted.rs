//! In-process status client replaying a fixed sequence

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use super::{BuildStatusClient, ClientError};
use crate::status::{BuildSnapshot, BuildStatus};

/// One scripted reply
#[derive(Debug, Clone)]
enum Reply {
    Status(BuildStatus),
    Error(String),
}

/// Replays statuses in order; the last entry repeats once the script runs out
#[derive(Debug)]
pub struct ScriptedStatusClient {
    replies: RefCell<VecDeque<Reply>>,
    last: RefCell<Option<Reply>>,
    metrics: serde_json::Value,
    calls: Cell<usize>,
}

impl ScriptedStatusClient {
    pub fn new(statuses: impl IntoIterator<Item = BuildStatus>) -> Self {
        Self {
            replies: RefCell::new(statuses.into_iter().map(Reply::Status).collect()),
            last: RefCell::new(None),
            metrics: serde_json::Value::Null,
            calls: Cell::new(0),
        }
    }

    /// Metrics attached to every snapshot
    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = metrics;
        self
    }

    /// Append a query failure to the script
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.replies.borrow_mut().push_back(Reply::Error(message.into()));
        self
    }

    /// Number of `get_build` calls so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl BuildStatusClient for ScriptedStatusClient {
    fn get_build(&self, build_id: &str) -> Result<BuildSnapshot, ClientError> {
        self.calls.set(self.calls.get() + 1);

        let next = self.replies.borrow_mut().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last.borrow_mut() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .borrow()
                .clone()
                .ok_or_else(|| ClientError::Query(format!("no scripted status for {}", build_id)))?,
        };

        match reply {
            Reply::Status(status) => {
                Ok(BuildSnapshot::new(build_id, status).with_metrics(self.metrics.clone()))
            }
            Reply::Error(message) => Err(ClientError::Query(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_in_order_then_repeats_last() {
        let client = ScriptedStatusClient::new([BuildStatus::InProgress, BuildStatus::Successful]);

        assert_eq!(client.get_build("b").unwrap().build_status, BuildStatus::InProgress);
        assert_eq!(client.get_build("b").unwrap().build_status, BuildStatus::Successful);
        assert_eq!(client.get_build("b").unwrap().build_status, BuildStatus::Successful);
        assert_eq!(client.calls(), 3);
    }

    #[test]
    fn test_empty_script_errors() {
        let client = ScriptedStatusClient::new(Vec::<BuildStatus>::new());
        assert!(client.get_build("b").is_err());
    }

    #[test]
    fn test_scripted_error() {
        let client = ScriptedStatusClient::new([BuildStatus::InProgress]).then_error("boom");
        assert!(client.get_build("b").is_ok());
        let err = client.get_build("b").unwrap_err();
        assert_eq!(err.to_string(), "status query failed: boom");
    }
}
