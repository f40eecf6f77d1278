//! Supervisor lifecycle integration tests.
//!
//! These tests drive the supervisor with mock nodes:
//! - state machine transitions (idle -> starting -> running -> stopped/failed)
//! - concurrent group launch and partial-launch teardown
//! - lazy node-exit detection through is_running
//! - stop idempotence and reverse-order teardown

use tempfile::TempDir;

use streampress_core::{
    config::{load_input_config_from_str, load_pipeline_config_from_str},
    testing::MockNodeFactory,
    NodeStatus, RunFailure, Supervisor, SupervisorConfig, SupervisorError, SupervisorState,
};

const ONE_VIDEO_INPUT: &str = r#"
inputs:
  - name: main
    path: media/source.mp4
    media_type: video
"#;

const VIDEO_AND_AUDIO_INPUTS: &str = r#"
inputs:
  - name: cam
    path: media/cam.mp4
    media_type: video
  - name: mic
    path: media/cam.mp4
    media_type: audio
"#;

const SINGLE_480P_VOD: &str = r#"
variants:
  - name: v480
    type: video
    codec: h264
    resolution: 480p
packaging:
  - name: dash
    manifest_format: dash
"#;

const AV_DASH_PIPELINE: &str = r#"
variants:
  - name: v480
    type: video
    codec: h264
    resolution: 480p
  - name: audio
    type: audio
    codec: aac
packaging:
  - name: dash
    manifest_format: dash
"#;

/// Test helper wiring a supervisor to mock nodes.
struct TestHarness {
    supervisor: Supervisor<MockNodeFactory>,
    factory: MockNodeFactory,
    output_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let factory = MockNodeFactory::new();
        let config = SupervisorConfig::default().with_grace_period(1);
        Self {
            supervisor: Supervisor::new(config, factory.clone()),
            factory,
            output_dir: TempDir::new().expect("Failed to create output dir"),
        }
    }

    async fn start(
        &self,
        input_yaml: &str,
        pipeline_yaml: &str,
        destination: Option<&str>,
    ) -> Result<(), SupervisorError> {
        let inputs = load_input_config_from_str(input_yaml).expect("input config");
        let pipeline = load_pipeline_config_from_str(pipeline_yaml).expect("pipeline config");
        self.supervisor
            .start(self.output_dir.path(), &inputs, &pipeline, destination)
            .await
    }

    fn starts(&self) -> Vec<String> {
        self.factory
            .events()
            .into_iter()
            .filter(|e| e.starts_with("start:"))
            .collect()
    }

    fn stops(&self) -> Vec<String> {
        self.factory
            .events()
            .into_iter()
            .filter(|e| e.starts_with("stop:"))
            .collect()
    }
}

// =============================================================================
// Startup
// =============================================================================

#[tokio::test]
async fn test_supervisor_starts_and_runs() {
    let harness = TestHarness::new();
    harness
        .start(VIDEO_AND_AUDIO_INPUTS, AV_DASH_PIPELINE, None)
        .await
        .unwrap();

    assert_eq!(harness.supervisor.state().await, SupervisorState::Running);
    assert!(harness.supervisor.is_running().await);

    let starts = harness.starts();
    assert_eq!(starts.len(), 3);
    assert!(starts.contains(&"start:enc_cam_v480".to_string()));
    assert!(starts.contains(&"start:enc_mic_audio".to_string()));
    assert!(starts.contains(&"start:pkg_dash".to_string()));
}

#[tokio::test]
async fn test_start_twice_fails() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None)
        .await
        .unwrap();

    let result = harness.start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None).await;
    assert!(matches!(
        result,
        Err(SupervisorError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_uploader_starts_after_packager() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, Some("gs://bucket/show"))
        .await
        .unwrap();

    let starts = harness.starts();
    assert_eq!(starts.len(), 3);
    assert_eq!(starts.last().unwrap(), "start:uploader");
}

#[tokio::test]
async fn test_invalid_destination_rejected_before_spawn() {
    let harness = TestHarness::new();
    let result = harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, Some("s3://bucket/show"))
        .await;

    assert!(matches!(result, Err(SupervisorError::Configuration(_))));
    assert_eq!(harness.supervisor.state().await, SupervisorState::Failed);
    assert!(harness.starts().is_empty());
}

#[tokio::test]
async fn test_duplicate_reader_config_rejected_before_spawn() {
    // Two packaging units claiming the same variant would give its
    // handoff two readers.
    let pipeline = r#"
variants:
  - name: v480
    type: video
    codec: h264
    resolution: 480p
packaging:
  - name: dash
    manifest_format: dash
    variants: [v480]
  - name: hls
    manifest_format: hls
    variants: [v480]
"#;
    let harness = TestHarness::new();
    let result = harness.start(ONE_VIDEO_INPUT, pipeline, None).await;

    assert!(matches!(result, Err(SupervisorError::Graph(_))));
    assert_eq!(harness.supervisor.state().await, SupervisorState::Failed);
    assert!(harness.starts().is_empty());
}

#[tokio::test]
async fn test_launch_failure_tears_down_only_launched_nodes() {
    let harness = TestHarness::new();
    harness.factory.fail_start("pkg_dash");

    let result = harness
        .start(VIDEO_AND_AUDIO_INPUTS, AV_DASH_PIPELINE, None)
        .await;

    assert!(matches!(
        result,
        Err(SupervisorError::Launch { ref node, .. }) if node == "pkg_dash"
    ));
    assert_eq!(harness.supervisor.state().await, SupervisorState::Failed);

    // The whole group attempted launch...
    assert_eq!(harness.starts().len(), 3);
    // ...but only the two successfully launched encoders were stopped.
    let stops = harness.stops();
    assert_eq!(stops.len(), 2);
    assert!(stops.contains(&"stop:enc_cam_v480".to_string()));
    assert!(stops.contains(&"stop:enc_mic_audio".to_string()));
}

// =============================================================================
// Running / exit detection
// =============================================================================

#[tokio::test]
async fn test_node_error_exit_is_detected_and_preserved() {
    let harness = TestHarness::new();
    harness
        .start(VIDEO_AND_AUDIO_INPUTS, AV_DASH_PIPELINE, None)
        .await
        .unwrap();

    harness
        .factory
        .handle("enc_cam_v480")
        .unwrap()
        .set_status(NodeStatus::ExitedError(1));

    // Detection is lazy: the next is_running call observes the exit.
    assert!(!harness.supervisor.is_running().await);
    assert_eq!(harness.supervisor.state().await, SupervisorState::Stopped);
    assert_eq!(
        harness.supervisor.failure().await,
        Some(RunFailure::NodeExited {
            node: "enc_cam_v480".to_string(),
            status: NodeStatus::ExitedError(1),
        })
    );

    // Every launched node received its stop call.
    assert_eq!(harness.stops().len(), 3);
}

#[tokio::test]
async fn test_clean_exit_ends_run_without_failure() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None)
        .await
        .unwrap();

    harness
        .factory
        .handle("pkg_dash")
        .unwrap()
        .set_status(NodeStatus::ExitedOk);

    assert!(!harness.supervisor.is_running().await);
    assert_eq!(harness.supervisor.state().await, SupervisorState::Stopped);
    assert_eq!(harness.supervisor.failure().await, None);
}

#[tokio::test]
async fn test_is_running_false_after_stop() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None)
        .await
        .unwrap();

    harness.supervisor.stop().await;
    assert!(!harness.supervisor.is_running().await);
}

// =============================================================================
// Stop
// =============================================================================

#[tokio::test]
async fn test_interrupt_stop_terminates_all_nodes() {
    let harness = TestHarness::new();
    harness
        .start(VIDEO_AND_AUDIO_INPUTS, AV_DASH_PIPELINE, None)
        .await
        .unwrap();
    assert!(harness.supervisor.is_running().await);

    // Simulated interrupt: a single stop call from above.
    harness.supervisor.stop().await;

    assert_eq!(harness.supervisor.state().await, SupervisorState::Stopped);
    for name in ["enc_cam_v480", "enc_mic_audio", "pkg_dash"] {
        let handle = harness.factory.handle(name).unwrap();
        assert_eq!(handle.start_calls(), 1, "node {} not started once", name);
        assert_eq!(handle.stop_calls(), 1, "node {} not stopped once", name);
    }
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None)
        .await
        .unwrap();

    harness.supervisor.stop().await;
    harness.supervisor.stop().await;

    assert_eq!(harness.supervisor.state().await, SupervisorState::Stopped);
    for name in ["enc_main_v480", "pkg_dash"] {
        assert_eq!(harness.factory.handle(name).unwrap().stop_calls(), 1);
    }
}

#[tokio::test]
async fn test_stop_from_idle_is_terminal_noop() {
    let harness = TestHarness::new();
    harness.supervisor.stop().await;
    assert_eq!(harness.supervisor.state().await, SupervisorState::Stopped);
    assert!(harness.factory.events().is_empty());
}

#[tokio::test]
async fn test_stop_issues_requests_in_reverse_start_order() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, Some("gs://bucket/show"))
        .await
        .unwrap();

    harness.supervisor.stop().await;

    let stops = harness.stops();
    assert_eq!(stops.first().unwrap(), "stop:uploader");
    assert_eq!(stops.last().unwrap(), "stop:enc_main_v480");
}

#[tokio::test]
async fn test_forced_termination_still_reaches_stopped() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None)
        .await
        .unwrap();

    harness
        .factory
        .handle("enc_main_v480")
        .unwrap()
        .set_forced_stop();

    harness.supervisor.stop().await;

    assert_eq!(harness.supervisor.state().await, SupervisorState::Stopped);
    // The forced kill is the run's only error, so it surfaces.
    assert!(matches!(
        harness.supervisor.failure().await,
        Some(RunFailure::Teardown { ref node, .. }) if node == "enc_main_v480"
    ));
}

#[tokio::test]
async fn test_teardown_error_drives_failed_state() {
    let harness = TestHarness::new();
    harness
        .start(ONE_VIDEO_INPUT, SINGLE_480P_VOD, None)
        .await
        .unwrap();

    harness
        .factory
        .handle("pkg_dash")
        .unwrap()
        .set_fail_stop();

    harness.supervisor.stop().await;

    assert_eq!(harness.supervisor.state().await, SupervisorState::Failed);
    assert!(matches!(
        harness.supervisor.failure().await,
        Some(RunFailure::Teardown { ref node, .. }) if node == "pkg_dash"
    ));
}

#[tokio::test]
async fn test_teardown_error_does_not_mask_node_failure() {
    let harness = TestHarness::new();
    harness
        .start(VIDEO_AND_AUDIO_INPUTS, AV_DASH_PIPELINE, None)
        .await
        .unwrap();

    harness
        .factory
        .handle("enc_cam_v480")
        .unwrap()
        .set_status(NodeStatus::ExitedError(2));
    harness.factory.handle("pkg_dash").unwrap().set_fail_stop();

    assert!(!harness.supervisor.is_running().await);

    // The node failure is the primary error and stays first.
    assert_eq!(
        harness.supervisor.failure().await,
        Some(RunFailure::NodeExited {
            node: "enc_cam_v480".to_string(),
            status: NodeStatus::ExitedError(2),
        })
    );
    assert_eq!(harness.supervisor.state().await, SupervisorState::Failed);
}
