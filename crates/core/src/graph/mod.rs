//! Pipeline graph construction.
//!
//! The graph turns a validated configuration into an ordered set of node
//! blueprints connected by byte-stream handoffs, and computes which nodes
//! must be launched concurrently because a blocking handoff joins them.
//! Everything here is checked before any process is spawned.

mod builder;
mod error;
mod types;

pub use builder::{GraphBuilder, GraphParams};
pub use error::GraphError;
pub use types::{handoff_path, Handoff, NodeSpec, PipelineGraph};
