//! Frame geometry and dimension normalization.
//!
//! H.264 (and most other consumer codecs) require even frame dimensions.
//! The normalizer only ever shrinks: decrementing an odd dimension keeps the
//! output inside the original frame bounds, where incrementing would not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by dimension normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("degenerate dimensions {width}x{height}")]
    Degenerate { width: u32, height: u32 },
}

/// A pair of pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both components even.
    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Normalize raw source dimensions to encoder-compatible ones.
///
/// Odd components are decremented by one. If `max_width` is given and the
/// width exceeds it, both components are scaled by `max_width / width` and
/// the even rule is re-applied to the scaled height. Dimensions of one pixel
/// or less are rejected rather than rounded to zero.
pub fn normalize_dimensions(
    width: u32,
    height: u32,
    max_width: Option<u32>,
) -> Result<Dimensions, GeometryError> {
    if width <= 1 || height <= 1 {
        return Err(GeometryError::Degenerate { width, height });
    }

    let mut w = width - (width % 2);
    let mut h = height - (height % 2);

    if let Some(max_w) = max_width {
        if w > max_w {
            let scale = max_w as f64 / w as f64;
            h = (h as f64 * scale) as u32;
            h -= h % 2;
            w = max_w - (max_w % 2);
        }
    }

    if w == 0 || h == 0 {
        return Err(GeometryError::Degenerate { width, height });
    }

    Ok(Dimensions::new(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_dimensions_are_identity() {
        for (w, h) in [(640, 360), (1280, 720), (2, 2), (1920, 1080)] {
            let dims = normalize_dimensions(w, h, None).unwrap();
            assert_eq!(dims, Dimensions::new(w, h));
        }
    }

    #[test]
    fn odd_dimensions_are_decremented() {
        let dims = normalize_dimensions(641, 360, None).unwrap();
        assert_eq!(dims, Dimensions::new(640, 360));

        let dims = normalize_dimensions(640, 361, None).unwrap();
        assert_eq!(dims, Dimensions::new(640, 360));

        let dims = normalize_dimensions(641, 361, None).unwrap();
        assert_eq!(dims, Dimensions::new(640, 360));
    }

    #[test]
    fn never_exceeds_input() {
        for (w, h) in [(3, 5), (101, 77), (1921, 1081)] {
            let dims = normalize_dimensions(w, h, None).unwrap();
            assert!(dims.width <= w && dims.height <= h);
            assert!(dims.is_even());
        }
    }

    #[test]
    fn downscales_to_max_width() {
        // 1920x1080 capped at 1280 -> 1280x720
        let dims = normalize_dimensions(1920, 1080, Some(1280)).unwrap();
        assert_eq!(dims, Dimensions::new(1280, 720));

        // Aspect ratio preserved within one pixel of rounding
        let dims = normalize_dimensions(1921, 1080, Some(1280)).unwrap();
        assert_eq!(dims.width, 1280);
        let expected = 1080.0 * (1280.0 / 1920.0);
        assert!((dims.height as f64 - expected).abs() <= 2.0);
        assert!(dims.is_even());
    }

    #[test]
    fn max_width_leaves_small_sources_alone() {
        let dims = normalize_dimensions(640, 360, Some(1280)).unwrap();
        assert_eq!(dims, Dimensions::new(640, 360));
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(normalize_dimensions(0, 360, None).is_err());
        assert!(normalize_dimensions(640, 0, None).is_err());
        assert!(normalize_dimensions(1, 1, None).is_err());
        assert!(normalize_dimensions(1, 1080, Some(1280)).is_err());
    }
}
