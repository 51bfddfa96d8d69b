use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::error::ConfigError;
use crate::location::CodeLocation;
use crate::node::NodeKind;

/// Error returned by a node body.
///
/// `Failure` is an ordinary test failure. `Fault` marks a declaration mistake
/// discovered while invoking the node; the engine records it as unrecoverable
/// and never retries the body.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Explicit failure raised by the body.
    #[error("{message}")]
    Failure {
        message: String,
        location: Option<CodeLocation>,
    },
    /// Declaration fault surfaced lazily at invocation time.
    #[error(transparent)]
    Fault(#[from] ConfigError),
}

impl NodeError {
    /// Construct a failure stamped with the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        NodeError::Failure {
            message: message.into(),
            location: Some(CodeLocation::caller()),
        }
    }

    /// Override the location reported for this error.
    pub fn at(self, location: CodeLocation) -> Self {
        match self {
            NodeError::Failure { message, .. } => NodeError::Failure {
                message,
                location: Some(location),
            },
            fault @ NodeError::Fault(_) => fault,
        }
    }
}

impl From<anyhow::Error> for NodeError {
    fn from(err: anyhow::Error) -> Self {
        NodeError::Failure {
            message: format!("{err:#}"),
            location: None,
        }
    }
}

/// Result alias returned by every node body.
pub type NodeResult = Result<(), NodeError>;

/// Fail the current node with a message located at the call site.
#[track_caller]
pub fn fail<T>(message: impl Into<String>) -> Result<T, NodeError> {
    Err(NodeError::new(message))
}

/// Terminal state of an example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecState {
    /// The example has not run yet.
    #[default]
    Invalid,
    Passed,
    Failed,
    Panicked,
    TimedOut,
    Pending,
    Skipped,
}

impl SpecState {
    /// Returns `true` for the three failure outcomes.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            SpecState::Failed | SpecState::Panicked | SpecState::TimedOut
        )
    }

    /// Stable lowercase label used for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            SpecState::Invalid => "invalid",
            SpecState::Passed => "passed",
            SpecState::Failed => "failed",
            SpecState::Panicked => "panicked",
            SpecState::TimedOut => "timed_out",
            SpecState::Pending => "pending",
            SpecState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for SpecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single authoritative failure recorded for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecFailure {
    /// Failure message (`"Test Panicked"` / `"Timed out"` for those causes).
    pub message: String,
    /// Where the failure was raised.
    pub location: CodeLocation,
    /// Panic payload rendered as text, present only for panics.
    pub forwarded_panic: Option<String>,
    /// Kind of node that was executing when the failure was recorded.
    pub component_type: NodeKind,
    /// Index into the component chain; the subject sits after every container.
    pub component_index: usize,
    /// Location of the failing node.
    pub component_location: CodeLocation,
}
