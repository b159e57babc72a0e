//! Frame-loop encoder built on OpenCV.
//!
//! Last-resort strategy for hosts without an FFmpeg binary: decode frames
//! with `VideoCapture`, apply effects in-process, and re-encode with
//! `VideoWriter`. Audio is dropped on this path.

use std::path::Path;

use async_trait::async_trait;
use image::RgbImage;
use opencv::core::{Mat, Scalar, Size, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT};
use tracing::{debug, info, warn};

use sitesense_models::EncodeRequest;

use crate::effects::apply_effects;
use crate::error::{MediaError, MediaResult};
use crate::strategy::EncoderStrategy;

/// Fourcc candidates in order of container compatibility.
const CODEC_CANDIDATES: &[(&str, &str)] = &[
    ("mp4v", "MPEG-4"),
    ("XVID", "Xvid"),
    ("MJPG", "Motion JPEG"),
];

/// Progress log interval, in frames.
const PROGRESS_EVERY: u64 = 100;

fn cv_err(e: opencv::Error) -> MediaError {
    MediaError::internal(format!("OpenCV error: {}", e))
}

/// Strategy that re-encodes frame by frame through OpenCV.
#[derive(Debug, Default)]
pub struct FrameLoopWriter;

impl FrameLoopWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EncoderStrategy for FrameLoopWriter {
    fn name(&self) -> &'static str {
        "opencv"
    }

    async fn available(&self) -> bool {
        // Compiled in; writer viability is probed per codec at encode time.
        true
    }

    async fn encode(
        &self,
        source: &Path,
        request: &EncodeRequest,
        output: &Path,
    ) -> MediaResult<()> {
        let source = source.to_path_buf();
        let output = output.to_path_buf();
        let request = request.clone();

        tokio::task::spawn_blocking(move || run_frame_loop(&source, &request, &output))
            .await
            .map_err(|e| MediaError::internal(format!("frame loop panicked: {}", e)))?
    }
}

fn run_frame_loop(source: &Path, request: &EncodeRequest, output: &Path) -> MediaResult<()> {
    let source_str = path_str(source)?;
    let output_str = path_str(output)?;

    let mut cap =
        VideoCapture::from_file(source_str, CAP_ANY).map_err(cv_err)?;
    if !cap.is_opened().map_err(cv_err)? {
        return Err(MediaError::unreadable(format!(
            "container open failed: {}",
            source.display()
        )));
    }

    let width = request.dimensions.width;
    let height = request.dimensions.height;
    let fps = request.fps;

    let source_frames = cap.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0);
    let source_fps = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
    let max_frames = request.max_frames();

    info!(
        width,
        height,
        fps,
        source_fps,
        source_frames,
        "Frame-loop encoding with OpenCV"
    );

    let (mut writer, codec_name) = open_writer(output_str, fps, width, height)?;
    debug!(codec = codec_name, "VideoWriter committed");

    let size = Size::new(width as i32, height as i32);
    let mut frame = Mat::default();
    let mut written: u64 = 0;

    while written < max_frames {
        let got = cap.read(&mut frame).map_err(cv_err)?;
        if !got || frame.empty() {
            break;
        }

        let matches_target =
            frame.cols() == width as i32 && frame.rows() == height as i32;
        let mut sized = if matches_target {
            frame.clone()
        } else {
            let mut resized = Mat::default();
            imgproc::resize(&frame, &mut resized, size, 0.0, 0.0, imgproc::INTER_LINEAR)
                .map_err(cv_err)?;
            resized
        };

        let mut rgb = bgr_mat_to_rgb(&sized)?;
        apply_effects(&mut rgb, &request.labels);
        write_rgb_into_bgr_mat(&rgb, &mut sized)?;

        writer.write(&sized).map_err(cv_err)?;
        written += 1;

        if written % PROGRESS_EVERY == 0 {
            debug!(written, max_frames, "Frame-loop progress");
        }
    }

    cap.release().map_err(cv_err)?;
    writer.release().map_err(cv_err)?;

    if written == 0 {
        return Err(MediaError::unreadable("no decodable frames in source"));
    }

    info!(written, codec = codec_name, "Frame-loop encoding finished");
    Ok(())
}

/// Open a `VideoWriter`, walking the codec table until one commits.
///
/// A writer can report open yet fail on the first write, so each candidate
/// is proven with a black test frame before the writer is reopened fresh
/// for real use.
fn open_writer(
    output: &str,
    fps: f64,
    width: u32,
    height: u32,
) -> MediaResult<(VideoWriter, &'static str)> {
    let size = Size::new(width as i32, height as i32);

    for (code, name) in CODEC_CANDIDATES {
        let fourcc = match fourcc_of(code) {
            Ok(f) => f,
            Err(e) => {
                warn!(codec = name, error = %e, "Fourcc rejected");
                continue;
            }
        };

        let opened = VideoWriter::new(output, fourcc, fps, size, true);
        let mut probe = match opened {
            Ok(w) => w,
            Err(e) => {
                warn!(codec = name, error = %e, "VideoWriter construction failed");
                continue;
            }
        };
        if !probe.is_opened().unwrap_or(false) {
            warn!(codec = name, "VideoWriter did not open");
            continue;
        }

        let test_frame =
            Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))
                .map_err(cv_err)?;
        if probe.write(&test_frame).is_err() {
            warn!(codec = name, "Test frame write failed");
            let _ = probe.release();
            continue;
        }
        probe.release().map_err(cv_err)?;

        // Reopen so the test frame does not leak into the output.
        let writer = VideoWriter::new(output, fourcc, fps, size, true).map_err(cv_err)?;
        if writer.is_opened().map_err(cv_err)? {
            return Ok((writer, name));
        }
    }

    Err(MediaError::unavailable(format!(
        "no working VideoWriter codec for {}x{} @ {} fps",
        width, height, fps
    )))
}

fn fourcc_of(code: &str) -> MediaResult<i32> {
    let mut chars = code.chars();
    let (Some(c1), Some(c2), Some(c3), Some(c4)) =
        (chars.next(), chars.next(), chars.next(), chars.next())
    else {
        return Err(MediaError::internal(format!("bad fourcc: {}", code)));
    };
    VideoWriter::fourcc(c1, c2, c3, c4).map_err(cv_err)
}

fn path_str(path: &Path) -> MediaResult<&str> {
    path.to_str()
        .ok_or_else(|| MediaError::internal("non-UTF8 path"))
}

/// Copy a BGR `Mat` into an `RgbImage`, swapping channel order.
fn bgr_mat_to_rgb(mat: &Mat) -> MediaResult<RgbImage> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let data = mat.data_bytes().map_err(cv_err)?;

    let mut image = RgbImage::new(width, height);
    for (chunk, pixel) in data.chunks_exact(3).zip(image.pixels_mut()) {
        pixel.0 = [chunk[2], chunk[1], chunk[0]];
    }
    Ok(image)
}

/// Copy an `RgbImage` back into an existing BGR `Mat` of the same shape.
fn write_rgb_into_bgr_mat(image: &RgbImage, mat: &mut Mat) -> MediaResult<()> {
    if mat.cols() as u32 != image.width() || mat.rows() as u32 != image.height() {
        return Err(MediaError::internal("frame shape changed during effects"));
    }

    let data = mat.data_bytes_mut().map_err(cv_err)?;
    for (chunk, pixel) in data.chunks_exact_mut(3).zip(image.pixels()) {
        chunk[0] = pixel.0[2];
        chunk[1] = pixel.0[1];
        chunk[2] = pixel.0[0];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mat_conversion_swaps_channels_both_ways() {
        let mut mat =
            Mat::new_rows_cols_with_default(2, 2, CV_8UC3, Scalar::all(0.0)).unwrap();
        {
            let data = mat.data_bytes_mut().unwrap();
            // First pixel pure blue in BGR, second pure red.
            data[0] = 255;
            data[5] = 255;
        }

        let rgb = bgr_mat_to_rgb(&mat).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 0]);

        let mut back =
            Mat::new_rows_cols_with_default(2, 2, CV_8UC3, Scalar::all(0.0)).unwrap();
        write_rgb_into_bgr_mat(&rgb, &mut back).unwrap();
        let data = back.data_bytes().unwrap();
        assert_eq!(&data[0..3], &[255, 0, 0]);
        assert_eq!(&data[3..6], &[0, 0, 255]);
    }

    #[test]
    fn fourcc_table_codes_are_four_chars() {
        for (code, _) in CODEC_CANDIDATES {
            assert_eq!(code.len(), 4);
        }
    }

    #[test]
    fn shape_mismatch_rejected() {
        let rgb = RgbImage::new(4, 4);
        let mut mat =
            Mat::new_rows_cols_with_default(2, 2, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(write_rgb_into_bgr_mat(&rgb, &mut mat).is_err());
    }
}
