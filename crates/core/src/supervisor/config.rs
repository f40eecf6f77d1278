//! Supervisor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::encoder::EncoderConfig;
use crate::mirror::MirrorConfig;
use crate::packager::PackagerConfig;

/// Operational knobs for a pipeline run. Everything has a sensible
/// default; the declarative input/pipeline configs are separate and
/// passed to `Supervisor::start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub packager: PackagerConfig,

    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Seconds a node gets to terminate voluntarily before it is
    /// force-killed.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Directory for the run's named pipes (default: a fresh temporary
    /// directory per run).
    #[serde(default)]
    pub pipe_dir: Option<PathBuf>,
}

fn default_grace_period() -> u64 {
    10
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            packager: PackagerConfig::default(),
            mirror: MirrorConfig::default(),
            grace_period_secs: default_grace_period(),
            pipe_dir: None,
        }
    }
}

impl SupervisorConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Sets the grace period in seconds.
    pub fn with_grace_period(mut self, secs: u64) -> Self {
        self.grace_period_secs = secs;
        self
    }

    /// Sets a fixed pipe directory instead of a per-run temporary one.
    pub fn with_pipe_dir(mut self, dir: PathBuf) -> Self {
        self.pipe_dir = Some(dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SupervisorConfig::default();
        assert_eq!(config.grace_period_secs, 10);
        assert_eq!(config.grace_period(), Duration::from_secs(10));
        assert!(config.pipe_dir.is_none());
        assert_eq!(config.encoder.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.packager.packager_path, PathBuf::from("packager"));
        assert_eq!(config.mirror.gsutil_path, PathBuf::from("gsutil"));
    }

    #[test]
    fn test_config_builder() {
        let config = SupervisorConfig::default()
            .with_grace_period(3)
            .with_pipe_dir(PathBuf::from("/tmp/pipes"));
        assert_eq!(config.grace_period_secs, 3);
        assert_eq!(config.pipe_dir, Some(PathBuf::from("/tmp/pipes")));
    }
}
