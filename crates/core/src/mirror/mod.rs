//! Cloud upload mirroring.
//!
//! The upload mirror is a background node that periodically syncs the
//! output directory to a remote object store while the pipeline runs.
//! Each sync invokes `gsutil rsync` as an external process; a final sync
//! runs during graceful shutdown so the last manifest update is mirrored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::node::{Invocation, LaunchError, Node, NodeRole, NodeStatus, StopError, StopOutcome};

/// Consecutive sync failures after which the mirror gives up and reports
/// itself exited.
const MAX_CONSECUTIVE_SYNC_FAILURES: u32 = 3;

/// Configuration for the upload mirror node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Path to the gsutil binary.
    #[serde(default = "default_gsutil_path")]
    pub gsutil_path: PathBuf,

    /// Seconds between sync passes.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
}

fn default_gsutil_path() -> PathBuf {
    PathBuf::from("gsutil")
}

fn default_sync_interval() -> u64 {
    5
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            gsutil_path: default_gsutil_path(),
            sync_interval_secs: default_sync_interval(),
        }
    }
}

impl MirrorConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

/// Build the sync invocation mirroring `output_dir` to `destination`.
pub fn sync_invocation(config: &MirrorConfig, output_dir: &Path, destination: &str) -> Invocation {
    Invocation::new(
        config.gsutil_path.clone(),
        vec![
            "-q".to_string(),
            "rsync".to_string(),
            "-r".to_string(),
            output_dir.to_string_lossy().to_string(),
            destination.to_string(),
        ],
    )
}

/// Background node continuously syncing new output files to the remote
/// destination.
pub struct UploadMirror {
    label: String,
    invocation: Invocation,
    interval: Duration,
    shutdown: Option<broadcast::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    failed: Arc<AtomicBool>,
    stopped: bool,
}

impl UploadMirror {
    pub fn new(label: impl Into<String>, invocation: Invocation, interval: Duration) -> Self {
        Self {
            label: label.into(),
            invocation,
            interval,
            shutdown: None,
            handle: None,
            failed: Arc::new(AtomicBool::new(false)),
            stopped: false,
        }
    }

    async fn run_loop(
        invocation: Invocation,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
        failed: Arc<AtomicBool>,
    ) {
        info!("Upload mirror loop started");
        let mut consecutive_failures = 0u32;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    // Final sync so the last manifest update reaches the
                    // destination.
                    if let Err(e) = Self::run_sync(&invocation).await {
                        warn!("Final upload sync failed: {}", e);
                    }
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    match Self::run_sync(&invocation).await {
                        Ok(()) => consecutive_failures = 0,
                        Err(e) => {
                            warn!("Upload sync failed: {}", e);
                            consecutive_failures += 1;
                            if consecutive_failures >= MAX_CONSECUTIVE_SYNC_FAILURES {
                                error!(
                                    "Upload sync failed {} times in a row, giving up",
                                    consecutive_failures
                                );
                                failed.store(true, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                }
            }
        }
        info!("Upload mirror loop stopped");
    }

    async fn run_sync(invocation: &Invocation) -> Result<(), String> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| e.to_string())?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("sync exited with status {:?}", status.code()))
        }
    }
}

#[async_trait]
impl Node for UploadMirror {
    fn label(&self) -> &str {
        &self.label
    }

    fn role(&self) -> NodeRole {
        NodeRole::Uploader
    }

    async fn start(&mut self) -> Result<(), LaunchError> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let invocation = self.invocation.clone();
        let interval = self.interval;
        let failed = Arc::clone(&self.failed);

        info!("Starting upload mirror {}: {}", self.label, self.invocation);
        self.handle = Some(tokio::spawn(Self::run_loop(
            invocation,
            interval,
            shutdown_rx,
            failed,
        )));
        self.shutdown = Some(shutdown_tx);
        Ok(())
    }

    async fn poll(&mut self) -> NodeStatus {
        let finished = match &self.handle {
            Some(handle) => handle.is_finished(),
            None => self.stopped,
        };
        if !finished {
            return NodeStatus::Alive;
        }
        if self.failed.load(Ordering::SeqCst) {
            NodeStatus::ExitedError(1)
        } else {
            NodeStatus::ExitedOk
        }
    }

    async fn stop(&mut self, grace: Duration) -> Result<StopOutcome, StopError> {
        if self.stopped {
            return Ok(StopOutcome::Graceful);
        }
        self.stopped = true;

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(mut handle) = self.handle.take() else {
            return Ok(StopOutcome::Graceful);
        };

        match timeout(grace, &mut handle).await {
            Ok(_) => Ok(StopOutcome::Graceful),
            Err(_) => {
                warn!(
                    "Upload mirror {} did not finish within {:?}, aborting",
                    self.label, grace
                );
                handle.abort();
                Ok(StopOutcome::Forced)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell_mirror(script: &str, interval_ms: u64) -> UploadMirror {
        UploadMirror::new(
            "uploader",
            Invocation::new("sh", vec!["-c".to_string(), script.to_string()]),
            Duration::from_millis(interval_ms),
        )
    }

    #[tokio::test]
    async fn test_mirror_runs_and_stops_cleanly() {
        let mut mirror = shell_mirror("exit 0", 10);
        mirror.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(mirror.poll().await, NodeStatus::Alive);

        let outcome = mirror.stop(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, StopOutcome::Graceful);
        assert_eq!(mirror.poll().await, NodeStatus::ExitedOk);
    }

    #[tokio::test]
    async fn test_mirror_reports_repeated_sync_failures() {
        let mut mirror = shell_mirror("exit 1", 10);
        mirror.start().await.unwrap();

        let mut status = NodeStatus::Alive;
        for _ in 0..200 {
            status = mirror.poll().await;
            if !status.is_alive() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, NodeStatus::ExitedError(1));
    }

    #[tokio::test]
    async fn test_mirror_stop_is_idempotent() {
        let mut mirror = shell_mirror("exit 0", 10);
        mirror.start().await.unwrap();
        mirror.stop(Duration::from_secs(5)).await.unwrap();

        let outcome = mirror.stop(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, StopOutcome::Graceful);
    }

    #[test]
    fn test_sync_invocation() {
        let config = MirrorConfig::default();
        let invocation = sync_invocation(&config, Path::new("/out"), "gs://bucket/show");
        assert_eq!(invocation.program, PathBuf::from("gsutil"));
        assert_eq!(
            invocation.args,
            vec!["-q", "rsync", "-r", "/out", "gs://bucket/show"]
        );
    }
}
