//! streampress-core: supervision for config-file driven media pipelines.
//!
//! Turns a declarative description of inputs and output renditions into
//! a directed graph of external encoder and packager processes joined by
//! named-pipe handoffs, plus an optional cloud-upload mirror, and
//! supervises their joint lifecycle: dependency-ordered startup, polled
//! liveness, and orderly, idempotent teardown on failure or interrupt.

pub mod config;
pub mod encoder;
pub mod graph;
pub mod handoff;
pub mod mirror;
pub mod node;
pub mod packager;
pub mod supervisor;
pub mod testing;

pub use config::{
    load_input_config, load_pipeline_config, validate_destination, validate_input_config,
    validate_pipeline_config, ConfigError, InputConfig, PipelineConfig, StreamingMode,
};
pub use encoder::EncoderConfig;
pub use graph::{GraphBuilder, GraphError, GraphParams, Handoff, NodeSpec, PipelineGraph};
pub use handoff::{HandoffError, HandoffSet};
pub use mirror::{MirrorConfig, UploadMirror};
pub use node::{
    Invocation, LaunchError, Node, NodeRole, NodeStatus, ProcessNode, StopError, StopOutcome,
};
pub use packager::PackagerConfig;
pub use supervisor::{
    NodeFactory, ProcessNodeFactory, RunFailure, Supervisor, SupervisorConfig, SupervisorError,
    SupervisorState,
};
