//! Source probing via FFprobe, with an OpenCV fallback.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Properties of a decoded video source.
///
/// Frame count and duration come from container metadata and may be absent
/// or unreliable; the pipeline treats them as hints, not guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Duration in seconds (0.0 when unknown)
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec name
    pub codec: String,
    /// File size in bytes
    pub size: u64,
    /// Total frame count when the container reports one
    pub frame_count: Option<u64>,
}

impl SourceInfo {
    /// Whether the container reported any decodable content at all.
    pub fn has_content(&self) -> bool {
        self.duration > 0.0 || self.frame_count.map_or(false, |n| n > 0)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Probe a video file for its properties.
///
/// Returns `FfprobeNotFound` when the binary is absent (callers may fall
/// back to [`probe_with_opencv`]) and `UnreadableSource` when FFprobe cannot
/// make sense of the file.
pub async fn probe_source(path: impl AsRef<Path>) -> MediaResult<SourceInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::unreadable(format!(
            "file not found: {}",
            path.display()
        )));
    }

    crate::command::check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::unreadable(format!(
            "container open failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::unreadable(format!("unparseable probe output: {}", e)))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::unreadable("no video stream found"))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(0.0);

    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok());

    Ok(SourceInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        size,
        frame_count,
    })
}

/// Probe via OpenCV when FFprobe is not on the host.
///
/// Blocking; run inside `spawn_blocking`.
#[cfg(feature = "opencv")]
pub fn probe_with_opencv(path: impl AsRef<Path>) -> MediaResult<SourceInfo> {
    use opencv::prelude::{VideoCaptureTrait, VideoCaptureTraitConst};
    use opencv::videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
        CAP_PROP_FRAME_WIDTH,
    };

    let path = path.as_ref();
    let path_str = path
        .to_str()
        .ok_or_else(|| MediaError::unreadable("non-UTF8 source path"))?;

    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let mut cap = VideoCapture::from_file(path_str, CAP_ANY)
        .map_err(|e| MediaError::unreadable(format!("container open failed: {}", e)))?;

    if !cap.is_opened().unwrap_or(false) {
        return Err(MediaError::unreadable("container open failed"));
    }

    let width = cap.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
    let height = cap.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
    let fps = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
    let frame_count = cap.get(CAP_PROP_FRAME_COUNT).ok().and_then(|n| {
        if n > 0.0 {
            Some(n as u64)
        } else {
            None
        }
    });

    let duration = match (frame_count, fps > 0.0) {
        (Some(n), true) => n as f64 / fps,
        _ => 0.0,
    };

    let _ = cap.release();

    Ok(SourceInfo {
        duration,
        width,
        height,
        fps,
        codec: String::new(),
        size,
        frame_count,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}
