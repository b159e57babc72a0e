//! Per-run encode request and safety limits.

use serde::{Deserialize, Serialize};

use crate::encoding::EncodingConfig;
use crate::geometry::{normalize_dimensions, Dimensions, GeometryError};
use crate::labels::ObjectLabels;

/// Hard limits applied to every pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Cap on output duration in seconds
    pub max_duration_secs: f64,
    /// Cap on output frame rate
    pub max_fps: f64,
    /// Downscale sources wider than this
    pub max_width: Option<u32>,
    /// Output files at or below this size are treated as encode failures
    pub min_output_bytes: u64,
    /// Wall-clock timeout for one external transcoder invocation
    pub transcode_timeout_secs: u64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_duration_secs: 300.0,
            max_fps: 30.0,
            max_width: Some(1280),
            min_output_bytes: 1000,
            transcode_timeout_secs: 600,
        }
    }
}

/// Immutable descriptor for one encode run.
///
/// Constructed once per pipeline run from probed source properties and the
/// caller-supplied label set; strategies read it, never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeRequest {
    /// Normalized (even) target dimensions
    pub dimensions: Dimensions,
    /// Target frame rate, already capped
    pub fps: f64,
    /// Detected-object labels driving the effects
    pub labels: ObjectLabels,
    /// Safety limits for this run
    pub limits: SafetyLimits,
    /// Encoding parameters for the external transcoder
    pub encoding: EncodingConfig,
}

impl EncodeRequest {
    /// Build a request from raw probed source properties.
    ///
    /// Dimensions are normalized (even, capped at `limits.max_width`) and the
    /// frame rate is capped at `limits.max_fps`. A zero or negative probed
    /// frame rate falls back to the cap.
    pub fn from_source(
        source_width: u32,
        source_height: u32,
        source_fps: f64,
        labels: ObjectLabels,
        limits: SafetyLimits,
    ) -> Result<Self, GeometryError> {
        let dimensions = normalize_dimensions(source_width, source_height, limits.max_width)?;
        let fps = if source_fps > 0.0 {
            source_fps.min(limits.max_fps)
        } else {
            limits.max_fps
        };

        Ok(Self {
            dimensions,
            fps,
            labels,
            limits,
            encoding: EncodingConfig::default(),
        })
    }

    /// Maximum number of frames to emit, derived from the duration cap.
    pub fn max_frames(&self) -> u64 {
        (self.fps * self.limits.max_duration_secs).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LABEL_PERSON;

    #[test]
    fn caps_frame_rate() {
        let req = EncodeRequest::from_source(
            640,
            360,
            60.0,
            ObjectLabels::new(),
            SafetyLimits::default(),
        )
        .unwrap();
        assert!((req.fps - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn keeps_slower_frame_rate() {
        let req = EncodeRequest::from_source(
            640,
            360,
            24.0,
            ObjectLabels::new(),
            SafetyLimits::default(),
        )
        .unwrap();
        assert!((req.fps - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unreliable_fps_falls_back_to_cap() {
        let req = EncodeRequest::from_source(
            640,
            360,
            0.0,
            ObjectLabels::new(),
            SafetyLimits::default(),
        )
        .unwrap();
        assert!((req.fps - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn normalizes_and_downscales() {
        let req = EncodeRequest::from_source(
            1921,
            1081,
            30.0,
            [LABEL_PERSON].into_iter().collect(),
            SafetyLimits::default(),
        )
        .unwrap();
        assert_eq!(req.dimensions.width, 1280);
        assert!(req.dimensions.is_even());
        assert!(req.labels.contains(LABEL_PERSON));
    }

    #[test]
    fn max_frames_from_duration_cap() {
        let req = EncodeRequest::from_source(
            640,
            360,
            30.0,
            ObjectLabels::new(),
            SafetyLimits::default(),
        )
        .unwrap();
        assert_eq!(req.max_frames(), 9000); // 30 fps * 300 s
    }

    #[test]
    fn degenerate_source_fails() {
        let result = EncodeRequest::from_source(
            0,
            360,
            30.0,
            ObjectLabels::new(),
            SafetyLimits::default(),
        );
        assert!(result.is_err());
    }
}
