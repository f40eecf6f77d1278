//! Pipeline supervision.
//!
//! The supervisor owns the pipeline graph and every process handle for
//! one run. It launches nodes group by group (members of a group
//! concurrently, so blocking handoffs can rendezvous), observes liveness
//! by polling, and drives an orderly, idempotent teardown on failure or
//! interruption.
//!
//! A supervisor is single-use: once it reaches `Stopped` or `Failed` it
//! is not restarted.

mod config;
mod controller;
mod factory;
mod types;

pub use config::SupervisorConfig;
pub use controller::Supervisor;
pub use factory::{NodeFactory, ProcessNodeFactory};
pub use types::{RunFailure, SupervisorError, SupervisorState};
