//! Mock node and node factory for supervisor tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::graph::NodeSpec;
use crate::node::{LaunchError, Node, NodeRole, NodeStatus, StopError, StopOutcome};
use crate::supervisor::NodeFactory;

#[derive(Debug)]
struct MockNodeState {
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    status: Mutex<NodeStatus>,
    fail_start: bool,
    forced_stop: Mutex<bool>,
    fail_stop: Mutex<bool>,
}

impl MockNodeState {
    fn new(fail_start: bool) -> Self {
        Self {
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            status: Mutex::new(NodeStatus::Alive),
            fail_start,
            forced_stop: Mutex::new(false),
            fail_stop: Mutex::new(false),
        }
    }
}

/// Handle for scripting and inspecting one mock node from a test.
#[derive(Clone)]
pub struct MockNodeHandle {
    state: Arc<MockNodeState>,
}

impl MockNodeHandle {
    /// Script the status the node reports on its next polls.
    pub fn set_status(&self, status: NodeStatus) {
        *self.state.status.lock().unwrap() = status;
    }

    /// Make the next `stop` report forced termination.
    pub fn set_forced_stop(&self) {
        *self.state.forced_stop.lock().unwrap() = true;
    }

    /// Make the next `stop` fail outright.
    pub fn set_fail_stop(&self) {
        *self.state.fail_stop.lock().unwrap() = true;
    }

    pub fn start_calls(&self) -> usize {
        self.state.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.state.stop_calls.load(Ordering::SeqCst)
    }
}

/// Mock implementation of the `Node` trait.
///
/// Records start/stop calls (locally and in the factory's global event
/// log) and reports whatever status its handle scripted.
pub struct MockNode {
    label: String,
    role: NodeRole,
    state: Arc<MockNodeState>,
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Node for MockNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn role(&self) -> NodeRole {
        self.role
    }

    async fn start(&mut self) -> Result<(), LaunchError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{}", self.label));
        self.state.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_start {
            return Err(LaunchError::Spawn {
                program: PathBuf::from(&self.label),
                source: std::io::Error::other("injected launch failure"),
            });
        }
        Ok(())
    }

    async fn poll(&mut self) -> NodeStatus {
        *self.state.status.lock().unwrap()
    }

    async fn stop(&mut self, _grace: Duration) -> Result<StopOutcome, StopError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("stop:{}", self.label));
        self.state.stop_calls.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_stop.lock().unwrap() {
            return Err(StopError::Signal("injected stop failure".to_string()));
        }
        if *self.state.forced_stop.lock().unwrap() {
            *self.state.status.lock().unwrap() = NodeStatus::ExitedError(137);
            return Ok(StopOutcome::Forced);
        }
        *self.state.status.lock().unwrap() = NodeStatus::ExitedOk;
        Ok(StopOutcome::Graceful)
    }
}

#[derive(Default)]
struct FactoryShared {
    events: Arc<Mutex<Vec<String>>>,
    nodes: Mutex<HashMap<String, Arc<MockNodeState>>>,
    fail_start: Mutex<HashSet<String>>,
}

/// Node factory producing mock nodes.
///
/// Clone the factory before handing it to the supervisor to keep a
/// handle on the shared state:
///
/// ```rust,ignore
/// let factory = MockNodeFactory::new();
/// factory.fail_start("pkg_dash");
/// let supervisor = Supervisor::new(config, factory.clone());
/// // ... later:
/// assert_eq!(factory.events(), vec!["start:enc_main_v480", ...]);
/// ```
#[derive(Clone, Default)]
pub struct MockNodeFactory {
    shared: Arc<FactoryShared>,
}

impl MockNodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the node with this name fail its `start` call.
    /// Must be configured before the supervisor builds its nodes.
    pub fn fail_start(&self, name: &str) {
        self.shared
            .fail_start
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    /// Global start/stop event log, in call order
    /// (`"start:<name>"` / `"stop:<name>"`).
    pub fn events(&self) -> Vec<String> {
        self.shared.events.lock().unwrap().clone()
    }

    /// Names of every node built so far.
    pub fn built_nodes(&self) -> Vec<String> {
        self.shared.nodes.lock().unwrap().keys().cloned().collect()
    }

    /// Handle for one built node, by name.
    pub fn handle(&self, name: &str) -> Option<MockNodeHandle> {
        self.shared
            .nodes
            .lock()
            .unwrap()
            .get(name)
            .map(|state| MockNodeHandle {
                state: Arc::clone(state),
            })
    }
}

impl NodeFactory for MockNodeFactory {
    fn build(&self, spec: &NodeSpec) -> Box<dyn Node> {
        let fail_start = self.shared.fail_start.lock().unwrap().contains(&spec.name);
        let state = Arc::new(MockNodeState::new(fail_start));
        self.shared
            .nodes
            .lock()
            .unwrap()
            .insert(spec.name.clone(), Arc::clone(&state));
        Box::new(MockNode {
            label: spec.name.clone(),
            role: spec.role,
            state,
            events: Arc::clone(&self.shared.events),
        })
    }
}
