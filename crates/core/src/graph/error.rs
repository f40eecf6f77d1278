//! Graph construction errors.

use thiserror::Error;

/// Errors detected while turning a configuration into a pipeline graph.
/// All of these surface before any process is spawned.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A handoff would have more than one writer node.
    #[error("handoff {handoff} has more than one writer")]
    DuplicateWriter { handoff: String },

    /// A handoff would have more than one reader node.
    #[error("handoff {handoff} has more than one reader")]
    DuplicateReader { handoff: String },

    /// A handoff is read but never written.
    #[error("handoff {handoff} has no writer")]
    MissingWriter { handoff: String },

    /// A handoff is written but never read.
    #[error("handoff {handoff} has no reader")]
    MissingReader { handoff: String },

    /// The configuration produces no output (packager) nodes.
    #[error("pipeline produces no output nodes")]
    NoOutputs,

    /// A packaging unit selects no encoder outputs.
    #[error("packaging unit {unit} selects no encoder outputs")]
    EmptyPackagingUnit { unit: String },
}
