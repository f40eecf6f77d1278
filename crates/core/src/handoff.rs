//! Named pipe lifecycle for handoffs.
//!
//! Every blocking handoff in the graph is realized as a POSIX named pipe
//! created before any process is spawned. The pipes live in a per-run
//! pipe directory and are unlinked once the run tears down.

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::graph::Handoff;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Failed to create named pipe {path}: {reason}")]
    Create { path: PathBuf, reason: String },

    #[error("Failed to create pipe directory {path}: {reason}")]
    Directory { path: PathBuf, reason: String },

    #[error("named pipes are not supported on this platform")]
    Unsupported,
}

/// The created pipes of one pipeline run. Unlinks them on cleanup (or
/// drop), releasing the handoff resources.
#[derive(Debug, Default)]
pub struct HandoffSet {
    paths: Vec<PathBuf>,
}

impl HandoffSet {
    /// Create the named pipe for every blocking handoff. On failure the
    /// pipes created so far are removed.
    pub fn create(handoffs: &[Handoff]) -> Result<Self, HandoffError> {
        let mut set = Self::default();
        for handoff in handoffs {
            if !handoff.blocking {
                continue;
            }
            set.make_fifo(handoff)?;
        }
        Ok(set)
    }

    #[cfg(unix)]
    fn make_fifo(&mut self, handoff: &Handoff) -> Result<(), HandoffError> {
        use nix::sys::stat::Mode;

        nix::unistd::mkfifo(&handoff.path, Mode::from_bits_truncate(0o644)).map_err(|e| {
            HandoffError::Create {
                path: handoff.path.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!("Created named pipe {} for handoff {}", handoff.path.display(), handoff.name);
        self.paths.push(handoff.path.clone());
        Ok(())
    }

    #[cfg(not(unix))]
    fn make_fifo(&mut self, _handoff: &Handoff) -> Result<(), HandoffError> {
        Err(HandoffError::Unsupported)
    }

    /// Unlink every created pipe. Removal errors are logged, not raised;
    /// a pipe may already be gone if the run directory was cleaned up.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!("Failed to remove pipe {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for HandoffSet {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::graph::handoff_path;

    fn handoff(dir: &std::path::Path, name: &str, blocking: bool) -> Handoff {
        Handoff {
            name: name.to_string(),
            path: handoff_path(dir, name),
            blocking,
        }
    }

    #[test]
    fn test_create_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let handoffs = vec![handoff(dir.path(), "a", true), handoff(dir.path(), "b", true)];

        let mut set = HandoffSet::create(&handoffs).unwrap();
        assert!(handoffs[0].path.exists());
        assert!(handoffs[1].path.exists());

        set.cleanup();
        assert!(!handoffs[0].path.exists());
        assert!(!handoffs[1].path.exists());
    }

    #[test]
    fn test_non_blocking_handoffs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let handoffs = vec![handoff(dir.path(), "a", false)];

        let _set = HandoffSet::create(&handoffs).unwrap();
        assert!(!handoffs[0].path.exists());
    }

    #[test]
    fn test_cleanup_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let handoffs = vec![handoff(dir.path(), "a", true)];
        {
            let _set = HandoffSet::create(&handoffs).unwrap();
            assert!(handoffs[0].path.exists());
        }
        assert!(!handoffs[0].path.exists());
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let handoffs = vec![Handoff {
            name: "a".to_string(),
            path: PathBuf::from("/nonexistent-dir/a.pipe"),
            blocking: true,
        }];
        assert!(matches!(
            HandoffSet::create(&handoffs),
            Err(HandoffError::Create { .. })
        ));
    }
}
