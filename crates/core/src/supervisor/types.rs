//! Supervisor state machine and error types.

use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::handoff::HandoffError;
use crate::node::{LaunchError, NodeStatus};

/// Lifecycle states of one pipeline run.
///
/// `Stopped` and `Failed` are terminal; the supervisor is single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
            SupervisorState::Failed => "failed",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended abnormally, preserved for reporting after teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// A node terminated with a failure status while the supervisor was
    /// running. The node's exit status is preserved.
    NodeExited { node: String, status: NodeStatus },

    /// Teardown itself had trouble: a node required forced termination
    /// or could not be terminated at all.
    Teardown { node: String, reason: String },
}

/// Errors that can occur while starting a pipeline run.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The parsed configuration is invalid. Surfaced before any process
    /// is spawned.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The configuration cannot be turned into a valid graph. Surfaced
    /// before any process is spawned.
    #[error("invalid pipeline graph: {0}")]
    Graph(#[from] GraphError),

    /// Handoff pipes could not be set up.
    #[error("handoff setup failed: {0}")]
    Handoff(#[from] HandoffError),

    /// A node failed to launch. Everything already launched was torn
    /// down before this error surfaced.
    #[error("failed to launch node {node}: {source}")]
    Launch {
        node: String,
        #[source]
        source: LaunchError,
    },

    /// The supervisor was asked to start from a non-idle state.
    #[error("supervisor is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}
