//! Supervised pipeline nodes.
//!
//! A node wraps one externally-invoked long-running process (an encode or
//! packaging task) or one internal background activity (the upload mirror)
//! behind a uniform start/poll/stop contract. The supervisor treats every
//! node the same way: it interprets only liveness and exit status, never
//! the wrapped process's output.

mod error;
mod process;
mod traits;
mod types;

pub use error::{LaunchError, StopError};
pub use process::ProcessNode;
pub use traits::Node;
pub use types::{Invocation, NodeRole, NodeStatus, StopOutcome};
