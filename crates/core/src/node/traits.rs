//! The node contract shared by all supervised units.

use async_trait::async_trait;
use std::time::Duration;

use super::error::{LaunchError, StopError};
use super::types::{NodeRole, NodeStatus, StopOutcome};

/// A supervised unit wrapping one external process or background activity.
#[async_trait]
pub trait Node: Send {
    /// Identifier used in logs and failure reports.
    fn label(&self) -> &str;

    fn role(&self) -> NodeRole;

    /// Launch the underlying process or activity. A successful return
    /// means the unit was created, not that it is doing useful work yet.
    async fn start(&mut self) -> Result<(), LaunchError>;

    /// Non-blocking liveness check. Must not block the caller even if the
    /// underlying process is stalled. Only meaningful after `start`.
    async fn poll(&mut self) -> NodeStatus;

    /// Request graceful termination, wait up to `grace`, then force
    /// termination if still alive. Idempotent: stopping an already-stopped
    /// node is a no-op. Owned handles are released regardless of how
    /// termination occurred.
    async fn stop(&mut self, grace: Duration) -> Result<StopOutcome, StopError>;
}
