//! FFmpeg encoder invocations.
//!
//! Each encoder node runs one ffmpeg process that reads a single input
//! stream and writes one encoded rendition into a named pipe. The
//! argument list is built here; the process itself is opaque to the
//! supervisor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{AudioCodec, Input, OutputVariant, StreamingMode, VariantKind, VideoCodec};
use crate::node::Invocation;

/// Configuration for the ffmpeg-based encoder nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info,
    /// verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            log_level: default_log_level(),
            extra_args: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Sets the ffmpeg binary path.
    pub fn with_ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = path;
        self
    }

    /// Sets the ffmpeg log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// Build the ffmpeg invocation encoding `input` into `variant`, writing
/// the result to the named pipe at `pipe`.
pub fn encoder_invocation(
    config: &EncoderConfig,
    input: &Input,
    variant: &OutputVariant,
    pipe: &Path,
    mode: StreamingMode,
) -> Invocation {
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        config.log_level.clone(),
    ];

    // Live inputs are read at native frame rate so the pipeline paces
    // itself off the source.
    if mode == StreamingMode::Live {
        args.push("-re".to_string());
    }

    if let Some(start) = input.start_time {
        args.extend(["-ss".to_string(), start.to_string()]);
    }

    args.extend(["-i".to_string(), input.path.to_string_lossy().to_string()]);

    match &variant.kind {
        VariantKind::Video { codec, resolution } => {
            args.extend(["-map".to_string(), format!("0:v:{}", input.track)]);
            args.push("-an".to_string());
            args.extend(["-c:v".to_string(), codec.ffmpeg_codec().to_string()]);
            args.extend(["-b:v".to_string(), format!("{}k", variant.bitrate_kbps())]);
            args.extend([
                "-vf".to_string(),
                format!("scale={}:{}", resolution.width(), resolution.height()),
            ]);
            if *codec == VideoCodec::H264 {
                args.extend(["-preset".to_string(), "veryfast".to_string()]);
            }
        }
        VariantKind::Audio { codec, channels } => {
            args.extend(["-map".to_string(), format!("0:a:{}", input.track)]);
            args.push("-vn".to_string());
            args.extend(["-c:a".to_string(), codec.ffmpeg_codec().to_string()]);
            args.extend(["-b:a".to_string(), format!("{}k", variant.bitrate_kbps())]);
            args.extend(["-ac".to_string(), channels.to_string()]);
        }
    }

    args.extend(["-f".to_string(), stream_format(variant).to_string()]);
    args.extend(config.extra_args.iter().cloned());
    args.push(pipe.to_string_lossy().to_string());

    Invocation::new(config.ffmpeg_path.clone(), args)
}

/// Container format written into the pipe; the packager demuxes it on
/// the other end.
fn stream_format(variant: &OutputVariant) -> &'static str {
    match &variant.kind {
        VariantKind::Video { codec, .. } => match codec {
            VideoCodec::H264 => "mpegts",
            VideoCodec::Vp9 => "webm",
        },
        VariantKind::Audio { codec, .. } => match codec {
            AudioCodec::Aac => "mpegts",
            AudioCodec::Opus => "webm",
        },
    }
}
