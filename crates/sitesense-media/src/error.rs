//! Error types for media operations.

use thiserror::Error;

use sitesense_models::GeometryError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("All encoding strategies failed: {0}")]
    EncodingFailed(String),

    #[error("Output artifact missing or undersized ({bytes} bytes, minimum {min})")]
    EmptyOutput { bytes: u64, min: u64 },

    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an unreadable-source error.
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::UnreadableSource(message.into())
    }

    /// Create an encoder-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::EncoderUnavailable(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error marks invalid caller input rather than a
    /// processing fault.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MediaError::UnreadableSource(_) | MediaError::Geometry(_)
        )
    }
}
