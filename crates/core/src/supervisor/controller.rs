//! The supervisor state machine.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::join_all;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{
    validate_destination, validate_input_config, validate_pipeline_config, InputConfig,
    PipelineConfig,
};
use crate::graph::{GraphParams, PipelineGraph};
use crate::handoff::{HandoffError, HandoffSet};
use crate::node::{LaunchError, Node, NodeStatus, StopOutcome};

use super::config::SupervisorConfig;
use super::factory::NodeFactory;
use super::types::{RunFailure, SupervisorError, SupervisorState};

/// Owns the pipeline graph and all process handles for one run.
///
/// Exactly one supervisor exists per pipeline run. `start` launches the
/// graph, the caller polls `is_running` on a coarse interval, and `stop`
/// tears everything down; `stop` is idempotent and never raises.
pub struct Supervisor<F: NodeFactory> {
    config: SupervisorConfig,
    factory: F,
    inner: Mutex<Inner>,
}

struct Inner {
    state: SupervisorState,
    /// Runnable nodes in launch order.
    nodes: Vec<Box<dyn Node>>,
    /// Indices of nodes whose `start()` succeeded, in start order.
    launched: Vec<usize>,
    handoffs: Option<HandoffSet>,
    pipe_dir: Option<PipeDir>,
    failure: Option<RunFailure>,
}

enum PipeDir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl PipeDir {
    fn path(&self) -> &Path {
        match self {
            PipeDir::Temp(dir) => dir.path(),
            PipeDir::Fixed(path) => path,
        }
    }
}

struct TeardownIssue {
    node: String,
    reason: String,
    fatal: bool,
}

impl<F: NodeFactory> Supervisor<F> {
    pub fn new(config: SupervisorConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            inner: Mutex::new(Inner {
                state: SupervisorState::Idle,
                nodes: Vec::new(),
                launched: Vec::new(),
                handoffs: None,
                pipe_dir: None,
                failure: None,
            }),
        }
    }

    pub async fn state(&self) -> SupervisorState {
        self.inner.lock().await.state
    }

    /// Why the run ended abnormally, if it did. Set when a node exits
    /// with a failure status or when teardown itself has trouble.
    pub async fn failure(&self) -> Option<RunFailure> {
        self.inner.lock().await.failure.clone()
    }

    /// Build the pipeline graph from the given configuration and launch
    /// every node, group by group.
    ///
    /// Validation and graph construction happen before any process is
    /// spawned. If any launch fails, everything already launched is torn
    /// down before the original error is returned, and the supervisor
    /// ends in `Failed`.
    pub async fn start(
        &self,
        output_dir: &Path,
        inputs: &InputConfig,
        pipeline: &PipelineConfig,
        destination: Option<&str>,
    ) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SupervisorState::Idle {
            return Err(SupervisorError::InvalidState {
                expected: SupervisorState::Idle.as_str(),
                actual: inner.state.as_str(),
            });
        }
        inner.state = SupervisorState::Starting;
        info!("Starting pipeline (output: {})", output_dir.display());

        match self
            .launch(&mut inner, output_dir, inputs, pipeline, destination)
            .await
        {
            Ok(()) => {
                inner.state = SupervisorState::Running;
                info!("Pipeline running with {} node(s)", inner.launched.len());
                Ok(())
            }
            Err(e) => {
                error!("Pipeline startup failed: {}", e);
                inner.state = SupervisorState::Stopping;
                // Teardown problems are logged only; the original error
                // must not be masked.
                let _ = Self::stop_launched(&mut inner, self.config.grace_period()).await;
                Self::release(&mut inner);
                inner.state = SupervisorState::Failed;
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        inner: &mut Inner,
        output_dir: &Path,
        inputs: &InputConfig,
        pipeline: &PipelineConfig,
        destination: Option<&str>,
    ) -> Result<(), SupervisorError> {
        validate_input_config(inputs)?;
        validate_pipeline_config(pipeline)?;
        if let Some(dest) = destination {
            validate_destination(dest)?;
        }

        let pipe_dir = self.create_pipe_dir()?;
        let params = GraphParams {
            output_dir,
            pipe_dir: pipe_dir.path(),
            inputs,
            pipeline,
            destination,
            encoder: &self.config.encoder,
            packager: &self.config.packager,
            mirror: &self.config.mirror,
        };
        let graph = PipelineGraph::from_config(&params)?;
        info!(
            "Pipeline graph built: {} node(s) in {} launch group(s), {} handoff(s)",
            graph.nodes().len(),
            graph.groups().len(),
            graph.handoffs().len()
        );

        let handoffs = HandoffSet::create(graph.handoffs())?;
        inner.nodes = graph.nodes().iter().map(|s| self.factory.build(s)).collect();
        inner.handoffs = Some(handoffs);
        inner.pipe_dir = Some(pipe_dir);

        // Launch groups in order. Members of a group open the two ends of
        // blocking handoffs, so their starts are issued concurrently; a
        // later group never starts before every start in earlier groups
        // returned.
        for range in graph.groups() {
            let names: Vec<&str> = graph.nodes()[range.clone()]
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            debug!("Launching group: {:?}", names);

            let results = {
                let slice = &mut inner.nodes[range.clone()];
                join_all(slice.iter_mut().map(|node| node.start())).await
            };

            let mut failure: Option<(String, LaunchError)> = None;
            for (offset, result) in results.into_iter().enumerate() {
                let idx = range.start + offset;
                match result {
                    Ok(()) => inner.launched.push(idx),
                    Err(e) => {
                        let node = graph.nodes()[idx].name.clone();
                        if failure.is_none() {
                            failure = Some((node, e));
                        } else {
                            error!("Node {} also failed to launch: {}", node, e);
                        }
                    }
                }
            }
            // A single member failing fails the whole group.
            if let Some((node, source)) = failure {
                return Err(SupervisorError::Launch { node, source });
            }
        }
        Ok(())
    }

    fn create_pipe_dir(&self) -> Result<PipeDir, SupervisorError> {
        match &self.config.pipe_dir {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| HandoffError::Directory {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(PipeDir::Fixed(path.clone()))
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("streampress-pipes-")
                    .tempdir()
                    .map_err(|e| HandoffError::Directory {
                        path: std::env::temp_dir(),
                        reason: e.to_string(),
                    })?;
                Ok(PipeDir::Temp(dir))
            }
        }
    }

    /// True iff the supervisor is running and every node's latest poll
    /// reported it alive.
    ///
    /// Node exits are detected here, not pushed: a node leaving `Alive`
    /// flips the supervisor into teardown the next time this is called,
    /// so detection latency is bounded by the caller's poll interval. A
    /// failure status is preserved in `failure()`; a clean exit ends the
    /// run without recording one (for on-demand content, the packager
    /// finishing is the normal end of the pipeline).
    pub async fn is_running(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != SupervisorState::Running {
            return false;
        }

        let launched = inner.launched.clone();
        let mut exited: Option<(String, NodeStatus)> = None;
        for idx in launched {
            let status = inner.nodes[idx].poll().await;
            if !status.is_alive() {
                exited = Some((inner.nodes[idx].label().to_string(), status));
                break;
            }
        }
        let Some((node, status)) = exited else {
            return true;
        };

        match status {
            NodeStatus::ExitedOk => {
                info!("Node {} finished, stopping the pipeline", node);
            }
            NodeStatus::ExitedError(code) => {
                error!("Node {} exited with code {}, stopping the pipeline", node, code);
                inner.failure = Some(RunFailure::NodeExited { node, status });
            }
            NodeStatus::Alive => unreachable!("exited node reported alive"),
        }

        inner.state = SupervisorState::Stopping;
        let issues = Self::stop_launched(&mut inner, self.config.grace_period()).await;
        Self::finish(&mut inner, issues);
        false
    }

    /// Stop the pipeline. Callable from any state; idempotent; never
    /// raises. Returns once every launched node is confirmed terminated
    /// or force-killed.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SupervisorState::Idle => {
                inner.state = SupervisorState::Stopped;
            }
            SupervisorState::Stopping | SupervisorState::Stopped | SupervisorState::Failed => {}
            SupervisorState::Starting | SupervisorState::Running => {
                info!("Stopping pipeline");
                inner.state = SupervisorState::Stopping;
                let issues = Self::stop_launched(&mut inner, self.config.grace_period()).await;
                Self::finish(&mut inner, issues);
            }
        }
    }

    /// Stop every launched node. Stop requests are issued in reverse
    /// start order; terminations are awaited concurrently so grace
    /// periods do not sum.
    async fn stop_launched(inner: &mut Inner, grace: Duration) -> Vec<TeardownIssue> {
        let launched: HashSet<usize> = inner.launched.iter().copied().collect();
        let futures: Vec<_> = inner
            .nodes
            .iter_mut()
            .enumerate()
            .rev()
            .filter(|(idx, _)| launched.contains(idx))
            .map(|(_, node)| async move {
                let label = node.label().to_string();
                let result = node.stop(grace).await;
                (label, result)
            })
            .collect();
        let results = join_all(futures).await;

        let mut issues = Vec::new();
        for (label, result) in results {
            match result {
                Ok(StopOutcome::Graceful) => {}
                Ok(StopOutcome::Forced) => {
                    warn!("Node {} required forced termination", label);
                    issues.push(TeardownIssue {
                        node: label,
                        reason: "required forced termination".to_string(),
                        fatal: false,
                    });
                }
                Err(e) => {
                    error!("Failed to stop node {}: {}", label, e);
                    issues.push(TeardownIssue {
                        node: label,
                        reason: e.to_string(),
                        fatal: true,
                    });
                }
            }
        }
        issues
    }

    fn finish(inner: &mut Inner, issues: Vec<TeardownIssue>) {
        let fatal = issues.iter().any(|issue| issue.fatal);
        // Teardown trouble surfaces only when it is the sole error of
        // the run; it never masks an earlier failure.
        if inner.failure.is_none() {
            if let Some(issue) = issues.into_iter().next() {
                inner.failure = Some(RunFailure::Teardown {
                    node: issue.node,
                    reason: issue.reason,
                });
            }
        }
        Self::release(inner);
        inner.state = if fatal {
            SupervisorState::Failed
        } else {
            SupervisorState::Stopped
        };
        info!("Pipeline {}", inner.state);
    }

    /// Release pipe resources once every node is down.
    fn release(inner: &mut Inner) {
        if let Some(mut handoffs) = inner.handoffs.take() {
            handoffs.cleanup();
        }
        inner.pipe_dir = None;
    }
}
