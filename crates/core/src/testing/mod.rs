//! Testing utilities and mock implementations for lifecycle tests.
//!
//! The mocks let supervisor tests run without spawning real encoder or
//! packager processes: node liveness is scripted, launch and stop
//! failures are injectable, and every start/stop call is recorded with
//! its global ordering.

mod mock_node;

pub use mock_node::{MockNode, MockNodeFactory, MockNodeHandle};
