//! Video encoding configuration.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Most compatible H.264 profile for browser playback
pub const DEFAULT_PROFILE: &str = "baseline";
/// H.264 level paired with the baseline profile
pub const DEFAULT_LEVEL: &str = "3.1";
/// Pixel format with the widest device support
pub const DEFAULT_PIX_FMT: &str = "yuv420p";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio sample rate
pub const DEFAULT_AUDIO_SAMPLE_RATE: &str = "44100";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Video encoding configuration for the external transcoder.
///
/// Defaults target maximum browser compatibility: H.264 baseline, yuv420p,
/// and `+faststart` so playback can begin before the full download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// H.264 profile
    #[serde(default = "default_profile")]
    pub profile: String,

    /// H.264 level
    #[serde(default = "default_level")]
    pub level: String,

    /// Pixel format
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio sample rate in Hz
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Enable progressive playback (moov atom up front)
    #[serde(default = "default_true")]
    pub faststart: bool,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}
fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}
fn default_pix_fmt() -> String {
    DEFAULT_PIX_FMT.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_sample_rate() -> String {
    DEFAULT_AUDIO_SAMPLE_RATE.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            profile: default_profile(),
            level: default_level(),
            pix_fmt: default_pix_fmt(),
            audio_codec: default_audio_codec(),
            audio_sample_rate: default_audio_sample_rate(),
            audio_bitrate: default_audio_bitrate(),
            faststart: true,
        }
    }
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pix_fmt.clone(),
            "-profile:v".to_string(),
            self.profile.clone(),
            "-level".to_string(),
            self.level.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-ar".to_string(),
            self.audio_sample_rate.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ];

        if self.faststart {
            args.extend_from_slice(&[
                "-movflags".to_string(),
                "+faststart".to_string(),
                "-fflags".to_string(),
                "+genpts".to_string(),
            ]);
        }

        args
    }
}
