//! External-process node implementation.

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::error::{LaunchError, StopError};
use super::traits::Node;
use super::types::{Invocation, NodeRole, NodeStatus, StopOutcome};

/// A node wrapping one externally-invoked process.
///
/// The child's stdout/stderr are inherited: the supervisor interprets only
/// the exit status, never the process's output. Handoff endpoints are
/// passed to the child as named pipe paths inside the argument list.
pub struct ProcessNode {
    label: String,
    role: NodeRole,
    invocation: Invocation,
    child: Option<Child>,
    exit: Option<NodeStatus>,
}

impl ProcessNode {
    pub fn new(label: impl Into<String>, role: NodeRole, invocation: Invocation) -> Self {
        Self {
            label: label.into(),
            role,
            invocation,
            child: None,
            exit: None,
        }
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }
}

#[async_trait]
impl Node for ProcessNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn role(&self) -> NodeRole {
        self.role
    }

    async fn start(&mut self) -> Result<(), LaunchError> {
        debug!("Launching {} node {}: {}", self.role, self.label, self.invocation);

        let mut command = Command::new(&self.invocation.program);
        command.args(&self.invocation.args).stdin(Stdio::null());

        match command.spawn() {
            Ok(child) => {
                info!(
                    "Started {} node {} (pid {:?})",
                    self.role,
                    self.label,
                    child.id()
                );
                self.child = Some(child);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LaunchError::ProgramNotFound {
                    program: self.invocation.program.clone(),
                })
            }
            Err(e) => Err(LaunchError::Spawn {
                program: self.invocation.program.clone(),
                source: e,
            }),
        }
    }

    async fn poll(&mut self) -> NodeStatus {
        if let Some(status) = self.exit {
            return status;
        }
        let Some(child) = &mut self.child else {
            return NodeStatus::Alive;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                let status = map_exit_status(status);
                self.exit = Some(status);
                self.child = None;
                status
            }
            Ok(None) => NodeStatus::Alive,
            Err(e) => {
                warn!("Failed to poll node {}: {}", self.label, e);
                NodeStatus::Alive
            }
        }
    }

    async fn stop(&mut self, grace: Duration) -> Result<StopOutcome, StopError> {
        let Some(mut child) = self.child.take() else {
            return Ok(StopOutcome::Graceful);
        };

        // Already exited on its own; just collect the status.
        if let Ok(Some(status)) = child.try_wait() {
            self.exit = Some(map_exit_status(status));
            return Ok(StopOutcome::Graceful);
        }

        send_interrupt(&child)?;

        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Node {} exited within grace period", self.label);
                self.exit = Some(map_exit_status(status));
                Ok(StopOutcome::Graceful)
            }
            Ok(Err(e)) => Err(StopError::Kill(e)),
            Err(_) => {
                warn!(
                    "Node {} did not exit within {:?}, force killing",
                    self.label, grace
                );
                child.start_kill()?;
                let status = child.wait().await?;
                self.exit = Some(map_exit_status(status));
                Ok(StopOutcome::Forced)
            }
        }
    }
}

fn map_exit_status(status: ExitStatus) -> NodeStatus {
    if status.success() {
        return NodeStatus::ExitedOk;
    }
    if let Some(code) = status.code() {
        return NodeStatus::ExitedError(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return NodeStatus::ExitedError(128 + signal);
        }
    }
    NodeStatus::ExitedError(-1)
}

#[cfg(unix)]
fn send_interrupt(child: &Child) -> Result<(), StopError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
        Ok(()) => Ok(()),
        // Process already gone between try_wait and the signal.
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(StopError::Signal(e.to_string())),
    }
}

#[cfg(not(unix))]
fn send_interrupt(_child: &Child) -> Result<(), StopError> {
    Ok(())
}
