//! Encoder strategy abstraction.
//!
//! The pipeline tries strategies in priority order and accepts the first one
//! that produces a verified output. Strategies are trait objects so tests
//! can drive the fallback logic with mocks.

use std::path::Path;

use async_trait::async_trait;
use sitesense_models::EncodeRequest;

use crate::error::{MediaError, MediaResult};

/// Outcome of a successful strategy run.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    /// Name of the strategy that produced the output
    pub strategy: &'static str,
    /// Size of the verified output in bytes
    pub bytes: u64,
}

/// One way of turning a source file into a processed output file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncoderStrategy: Send + Sync {
    /// Stable name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Cheap availability check, consulted before attempting an encode.
    async fn available(&self) -> bool;

    /// Encode `source` into `output` per the request.
    ///
    /// Implementations must either produce `output` or return an error; they
    /// never verify their own output, the pipeline does that uniformly.
    async fn encode(
        &self,
        source: &Path,
        request: &EncodeRequest,
        output: &Path,
    ) -> MediaResult<()>;
}

/// Verify that a strategy produced a plausible output file.
///
/// Returns the file size, or `EmptyOutput` when the file is missing or at or
/// below the minimum byte threshold.
pub fn verify_output(path: &Path, min_bytes: u64) -> MediaResult<u64> {
    let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if bytes <= min_bytes {
        return Err(MediaError::EmptyOutput {
            bytes,
            min: min_bytes,
        });
    }
    Ok(bytes)
}
