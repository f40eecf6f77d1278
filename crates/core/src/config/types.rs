use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Declarative description of the media inputs feeding a pipeline run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    pub inputs: Vec<Input>,
}

/// One media input: a file (or capture device) providing a single
/// elementary stream to the encoders.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Input {
    /// Unique name, referenced in node and handoff identifiers.
    pub name: String,

    /// Path to the media file or device.
    pub path: PathBuf,

    /// Which kind of elementary stream this input provides.
    pub media_type: MediaType,

    /// Track index inside the container.
    #[serde(default)]
    pub track: u32,

    /// Seek offset in seconds applied before encoding.
    #[serde(default)]
    pub start_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Audio,
    Video,
}

/// Declarative description of the outputs a pipeline run produces.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// On-demand or live packaging.
    #[serde(default)]
    pub streaming_mode: StreamingMode,

    /// Output renditions to encode.
    pub variants: Vec<OutputVariant>,

    /// Packaging units; each one becomes a packager process aggregating
    /// the encoder outputs of its selected variants.
    pub packaging: Vec<PackagingUnit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingMode {
    #[default]
    Vod,
    Live,
}

/// One output rendition (a resolution/bitrate/codec combination).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputVariant {
    /// Unique name, referenced by packaging units.
    pub name: String,

    #[serde(flatten)]
    pub kind: VariantKind,

    /// Target bitrate override; defaults depend on resolution or codec.
    #[serde(default)]
    pub bitrate_kbps: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantKind {
    Video {
        codec: VideoCodec,
        resolution: Resolution,
    },
    Audio {
        codec: AudioCodec,
        #[serde(default = "default_channels")]
        channels: u8,
    },
}

fn default_channels() -> u8 {
    2
}

impl OutputVariant {
    /// The media type of the inputs this variant is encoded from.
    pub fn media_type(&self) -> MediaType {
        match self.kind {
            VariantKind::Video { .. } => MediaType::Video,
            VariantKind::Audio { .. } => MediaType::Audio,
        }
    }

    /// Resolved target bitrate: the explicit override, or a default
    /// derived from the resolution (video) or codec (audio).
    pub fn bitrate_kbps(&self) -> u32 {
        if let Some(bitrate) = self.bitrate_kbps {
            return bitrate;
        }
        match &self.kind {
            VariantKind::Video { resolution, .. } => resolution.default_bitrate_kbps(),
            VariantKind::Audio { codec, .. } => codec.default_bitrate_kbps(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Resolution {
    #[serde(rename = "240p")]
    R240p,
    #[serde(rename = "360p")]
    R360p,
    #[serde(rename = "480p")]
    R480p,
    #[serde(rename = "720p")]
    R720p,
    #[serde(rename = "1080p")]
    R1080p,
    #[serde(rename = "4k")]
    R4k,
}

impl Resolution {
    pub fn width(&self) -> u32 {
        match self {
            Resolution::R240p => 426,
            Resolution::R360p => 640,
            Resolution::R480p => 854,
            Resolution::R720p => 1280,
            Resolution::R1080p => 1920,
            Resolution::R4k => 3840,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Resolution::R240p => 240,
            Resolution::R360p => 360,
            Resolution::R480p => 480,
            Resolution::R720p => 720,
            Resolution::R1080p => 1080,
            Resolution::R4k => 2160,
        }
    }

    pub fn default_bitrate_kbps(&self) -> u32 {
        match self {
            Resolution::R240p => 300,
            Resolution::R360p => 600,
            Resolution::R480p => 1000,
            Resolution::R720p => 2500,
            Resolution::R1080p => 5000,
            Resolution::R4k => 17000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    H264,
    Vp9,
}

impl VideoCodec {
    /// The ffmpeg encoder name for this codec.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    Aac,
    Opus,
}

impl AudioCodec {
    /// The ffmpeg encoder name for this codec.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Opus => "libopus",
        }
    }

    pub fn default_bitrate_kbps(&self) -> u32 {
        match self {
            AudioCodec::Aac => 128,
            AudioCodec::Opus => 64,
        }
    }
}

/// One packaging unit: a packager process producing a manifest plus the
/// segments of its selected variants.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackagingUnit {
    /// Unique name, used for the manifest file name and node identifier.
    pub name: String,

    pub manifest_format: ManifestFormat,

    /// Segment duration in seconds.
    #[serde(default = "default_segment_duration")]
    pub segment_duration_secs: f64,

    /// Variant names this unit packages (default: every declared variant).
    #[serde(default)]
    pub variants: Option<Vec<String>>,
}

fn default_segment_duration() -> f64 {
    4.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    Dash,
    Hls,
}

impl ManifestFormat {
    /// File extension of the manifest this format produces.
    pub fn manifest_extension(&self) -> &'static str {
        match self {
            ManifestFormat::Dash => "mpd",
            ManifestFormat::Hls => "m3u8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_dimensions() {
        assert_eq!(Resolution::R480p.width(), 854);
        assert_eq!(Resolution::R480p.height(), 480);
        assert_eq!(Resolution::R1080p.height(), 1080);
    }

    #[test]
    fn test_variant_bitrate_defaults() {
        let variant = OutputVariant {
            name: "v480".to_string(),
            kind: VariantKind::Video {
                codec: VideoCodec::H264,
                resolution: Resolution::R480p,
            },
            bitrate_kbps: None,
        };
        assert_eq!(variant.bitrate_kbps(), 1000);

        let with_override = OutputVariant {
            bitrate_kbps: Some(1200),
            ..variant
        };
        assert_eq!(with_override.bitrate_kbps(), 1200);
    }

    #[test]
    fn test_variant_media_type() {
        let video = OutputVariant {
            name: "v".to_string(),
            kind: VariantKind::Video {
                codec: VideoCodec::H264,
                resolution: Resolution::R720p,
            },
            bitrate_kbps: None,
        };
        let audio = OutputVariant {
            name: "a".to_string(),
            kind: VariantKind::Audio {
                codec: AudioCodec::Aac,
                channels: 2,
            },
            bitrate_kbps: None,
        };
        assert_eq!(video.media_type(), MediaType::Video);
        assert_eq!(audio.media_type(), MediaType::Audio);
    }

    #[test]
    fn test_streaming_mode_default() {
        assert_eq!(StreamingMode::default(), StreamingMode::Vod);
    }

    #[test]
    fn test_manifest_extension() {
        assert_eq!(ManifestFormat::Dash.manifest_extension(), "mpd");
        assert_eq!(ManifestFormat::Hls.manifest_extension(), "m3u8");
    }
}
