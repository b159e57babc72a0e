//! External FFmpeg transcoder strategy.
//!
//! Preferred over the frame-loop writer whenever an `ffmpeg` binary is on
//! the host: it handles audio, honors the encoding profile exactly, and is
//! far faster than decoding frames in-process.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use sitesense_models::EncodeRequest;

use crate::command::{ffmpeg_available, FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::build_filter_chain;
use crate::strategy::EncoderStrategy;

/// Strategy that shells out to FFmpeg for the whole transcode.
#[derive(Debug, Default)]
pub struct ExternalTranscoder;

impl ExternalTranscoder {
    pub fn new() -> Self {
        Self
    }

    fn build_command(
        source: &Path,
        request: &EncodeRequest,
        output: &Path,
    ) -> FfmpegCommand {
        let filter = build_filter_chain(request.dimensions, &request.labels);
        FfmpegCommand::new(source, output)
            .video_filter(filter)
            .encoding(&request.encoding)
            .duration_cap(request.limits.max_duration_secs)
            .fps_cap(request.fps)
    }
}

#[async_trait]
impl EncoderStrategy for ExternalTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn available(&self) -> bool {
        ffmpeg_available().await
    }

    async fn encode(
        &self,
        source: &Path,
        request: &EncodeRequest,
        output: &Path,
    ) -> MediaResult<()> {
        let cmd = Self::build_command(source, request, output);

        info!(
            width = request.dimensions.width,
            height = request.dimensions.height,
            fps = request.fps,
            "Transcoding with external FFmpeg"
        );

        FfmpegRunner::new()
            .with_timeout(request.limits.transcode_timeout_secs)
            .run(&cmd)
            .await
    }
}
