//! Turning graph blueprints into runnable nodes.

use std::time::Duration;

use crate::graph::NodeSpec;
use crate::mirror::UploadMirror;
use crate::node::{Node, NodeRole, ProcessNode};

use super::config::SupervisorConfig;

/// Builds runnable nodes from graph blueprints.
///
/// The seam exists so lifecycle tests can substitute controllable mock
/// nodes (see `testing::MockNodeFactory`).
pub trait NodeFactory: Send + Sync {
    fn build(&self, spec: &NodeSpec) -> Box<dyn Node>;
}

/// Production factory: external processes for encoders and packagers, a
/// background upload mirror for the uploader.
pub struct ProcessNodeFactory {
    sync_interval: Duration,
}

impl ProcessNodeFactory {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            sync_interval: config.mirror.sync_interval(),
        }
    }
}

impl NodeFactory for ProcessNodeFactory {
    fn build(&self, spec: &NodeSpec) -> Box<dyn Node> {
        match spec.role {
            NodeRole::Encoder | NodeRole::Packager => Box::new(ProcessNode::new(
                spec.name.clone(),
                spec.role,
                spec.invocation.clone(),
            )),
            NodeRole::Uploader => Box::new(UploadMirror::new(
                spec.name.clone(),
                spec.invocation.clone(),
                self.sync_interval,
            )),
        }
    }
}
