use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::node::{Invocation, NodeRole};

/// A named byte channel between exactly one writer node and one reader
/// node, realized as a POSIX named pipe. Opening one end of a blocking
/// handoff blocks until the peer opens the other end.
#[derive(Debug, Clone)]
pub struct Handoff {
    pub name: String,
    pub path: PathBuf,
    pub blocking: bool,
}

/// Filesystem path of a handoff's named pipe inside the run's pipe
/// directory.
pub fn handoff_path(pipe_dir: &Path, name: &str) -> PathBuf {
    pipe_dir.join(format!("{}.pipe", name))
}

/// Blueprint for one node: identity, invocation and the handoffs it
/// reads from and writes to.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    pub invocation: Invocation,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
}

/// The ordered node groups of one pipeline run.
///
/// Node specs are laid out in launch order; each group is a contiguous
/// slice of specs whose members must be started concurrently.
#[derive(Debug)]
pub struct PipelineGraph {
    pub(super) specs: Vec<NodeSpec>,
    pub(super) groups: Vec<Range<usize>>,
    pub(super) handoffs: Vec<Handoff>,
}

impl PipelineGraph {
    /// Node specs in launch order.
    pub fn nodes(&self) -> &[NodeSpec] {
        &self.specs
    }

    /// Launch groups as index ranges into `nodes()`, in start order.
    pub fn groups(&self) -> &[Range<usize>] {
        &self.groups
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    pub fn count_role(&self, role: NodeRole) -> usize {
        self.specs.iter().filter(|s| s.role == role).count()
    }
}
