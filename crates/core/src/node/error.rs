//! Error types for node lifecycle operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while launching a node.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The process image could not be located.
    #[error("Program not found: {program}")]
    ProgramNotFound { program: PathBuf },

    /// The process could not be spawned.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while terminating a node.
#[derive(Debug, Error)]
pub enum StopError {
    /// The graceful termination signal could not be delivered.
    #[error("Failed to deliver termination signal: {0}")]
    Signal(String),

    /// Forced termination itself failed.
    #[error("Failed to force-kill process: {0}")]
    Kill(#[from] std::io::Error),
}
