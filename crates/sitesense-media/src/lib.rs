//! Video re-encoding pipeline with multi-strategy fallback.
//!
//! Takes an uploaded video plus a set of detected-object labels, applies
//! label-driven visual effects and a watermark, and re-encodes to a
//! web-compatible MP4. An external FFmpeg transcode is preferred; hosts
//! without FFmpeg fall back to an OpenCV frame loop.

pub mod command;
pub mod effects;
pub mod error;
pub mod events;
pub mod filters;
pub mod pipeline;
pub mod probe;
pub mod strategy;
pub mod transcode;

#[cfg(feature = "opencv")]
pub mod frame_writer;

pub use command::{check_ffmpeg, check_ffprobe, ffmpeg_available, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use events::{EventSink, PipelineEvent, TracingSink};
pub use filters::build_filter_chain;
pub use pipeline::{Pipeline, ProcessedArtifact};
pub use probe::{probe_source, SourceInfo};
pub use strategy::{EncodeOutcome, EncoderStrategy};
pub use transcode::ExternalTranscoder;

#[cfg(feature = "opencv")]
pub use frame_writer::FrameLoopWriter;
