//! Shaka Packager invocations.
//!
//! Each packager node runs one packager process that reads encoded
//! renditions from named pipes and writes a manifest plus segment/media
//! files into the output directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ManifestFormat, MediaType, PackagingUnit, StreamingMode};
use crate::node::Invocation;

/// Configuration for the Shaka Packager nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagerConfig {
    /// Path to the packager binary.
    #[serde(default = "default_packager_path")]
    pub packager_path: PathBuf,

    /// Suppress the packager's progress output.
    #[serde(default = "default_quiet")]
    pub quiet: bool,

    /// Additional packager arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_packager_path() -> PathBuf {
    PathBuf::from("packager")
}

fn default_quiet() -> bool {
    true
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            packager_path: default_packager_path(),
            quiet: default_quiet(),
            extra_args: Vec::new(),
        }
    }
}

impl PackagerConfig {
    /// Sets the packager binary path.
    pub fn with_packager_path(mut self, path: PathBuf) -> Self {
        self.packager_path = path;
        self
    }
}

/// One encoded rendition consumed by a packager: which pipe to read and
/// how to label the output files.
#[derive(Debug, Clone)]
pub struct PackagerStream {
    /// Label used for output file names; unique per pipeline run.
    pub label: String,
    pub media_type: MediaType,
    pub pipe: PathBuf,
}

/// Build the packager invocation for one packaging unit.
pub fn packager_invocation(
    config: &PackagerConfig,
    unit: &PackagingUnit,
    streams: &[PackagerStream],
    output_dir: &Path,
    mode: StreamingMode,
) -> Invocation {
    let mut args = Vec::new();

    for stream in streams {
        let kind = match stream.media_type {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        };
        let descriptor = match mode {
            StreamingMode::Vod => format!(
                "in={},stream={},output={}",
                stream.pipe.display(),
                kind,
                output_dir.join(format!("{}.mp4", stream.label)).display()
            ),
            StreamingMode::Live => format!(
                "in={},stream={},init_segment={},segment_template={}",
                stream.pipe.display(),
                kind,
                output_dir
                    .join(format!("{}_init.mp4", stream.label))
                    .display(),
                output_dir
                    .join(format!("{}_$Number$.m4s", stream.label))
                    .display()
            ),
        };
        args.push(descriptor);
    }

    args.extend([
        "--segment_duration".to_string(),
        unit.segment_duration_secs.to_string(),
    ]);

    let manifest = output_dir.join(format!(
        "{}.{}",
        unit.name,
        unit.manifest_format.manifest_extension()
    ));
    match unit.manifest_format {
        ManifestFormat::Dash => {
            args.extend(["--mpd_output".to_string(), manifest.display().to_string()]);
        }
        ManifestFormat::Hls => {
            args.extend([
                "--hls_master_playlist_output".to_string(),
                manifest.display().to_string(),
            ]);
        }
    }

    if config.quiet {
        args.push("--quiet".to_string());
    }

    args.extend(config.extra_args.iter().cloned());

    Invocation::new(config.packager_path.clone(), args)
}
