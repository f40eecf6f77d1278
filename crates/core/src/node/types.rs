use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What a node does in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Encoder,
    Packager,
    Uploader,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Encoder => "encoder",
            NodeRole::Packager => "packager",
            NodeRole::Uploader => "uploader",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a non-blocking liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// The underlying process or task is still running.
    Alive,
    /// Terminated with a success status.
    ExitedOk,
    /// Terminated with a failure status. Signal deaths are reported as
    /// 128 + signal number, the shell convention.
    ExitedError(i32),
}

impl NodeStatus {
    pub fn is_alive(&self) -> bool {
        matches!(self, NodeStatus::Alive)
    }
}

/// How a node terminated during `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The node exited within the grace period (or had already exited).
    Graceful,
    /// The node had to be force-killed after the grace period elapsed.
    Forced,
}

/// An external command invocation: a program plus its constructed
/// argument list.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_status_is_alive() {
        assert!(NodeStatus::Alive.is_alive());
        assert!(!NodeStatus::ExitedOk.is_alive());
        assert!(!NodeStatus::ExitedError(1).is_alive());
    }

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("ffmpeg", vec!["-y".to_string(), "-i".to_string()]);
        assert_eq!(invocation.to_string(), "ffmpeg -y -i");
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(NodeRole::Encoder.as_str(), "encoder");
        assert_eq!(NodeRole::Uploader.to_string(), "uploader");
    }
}
