//! Pipeline orchestrator.
//!
//! Persists an uploaded source into a per-run scratch directory, probes it,
//! then walks the encoder strategies in priority order until one produces a
//! verified output. The scratch directory is owned by the returned artifact,
//! so temp files disappear on every exit path, including errors and aborts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tempfile::TempDir;
use uuid::Uuid;

use sitesense_models::{EncodeRequest, ObjectLabels, SafetyLimits};

use crate::error::{MediaError, MediaResult};
use crate::events::{EventSink, PipelineEvent, TracingSink};
use crate::probe::{probe_source, SourceInfo};
use crate::strategy::{verify_output, EncodeOutcome, EncoderStrategy};
use crate::transcode::ExternalTranscoder;

#[cfg(feature = "opencv")]
use crate::frame_writer::FrameLoopWriter;

/// Prefix for per-run scratch directories.
const SCRATCH_PREFIX: &str = "sitesense-";

const ATTEMPTS_METRIC: &str = "sitesense_encode_attempts_total";

/// A verified processed video, alive only as long as this value.
///
/// Dropping the artifact removes the scratch directory and everything in it.
#[derive(Debug)]
pub struct ProcessedArtifact {
    scratch: TempDir,
    path: PathBuf,
    /// Verified output size in bytes
    pub bytes: u64,
    /// Name of the strategy that produced the output
    pub strategy: &'static str,
    /// Probed properties of the source
    pub source: SourceInfo,
}

impl ProcessedArtifact {
    /// Path of the output file inside the scratch directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole output into memory.
    pub async fn read_bytes(&self) -> MediaResult<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Multi-strategy video re-encoding pipeline.
pub struct Pipeline {
    strategies: Vec<Box<dyn EncoderStrategy>>,
    limits: SafetyLimits,
    sink: Arc<dyn EventSink>,
    scratch_root: Option<PathBuf>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Pipeline with the stock strategy order: external FFmpeg first, then
    /// the OpenCV frame loop when compiled in.
    pub fn new() -> Self {
        let mut strategies: Vec<Box<dyn EncoderStrategy>> = Vec::new();
        strategies.push(Box::new(ExternalTranscoder::new()));
        #[cfg(feature = "opencv")]
        strategies.push(Box::new(FrameLoopWriter::new()));

        Self {
            strategies,
            limits: SafetyLimits::default(),
            sink: Arc::new(TracingSink),
            scratch_root: None,
        }
    }

    /// Replace the strategy list, keeping priority order.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn EncoderStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Override the safety limits.
    pub fn with_limits(mut self, limits: SafetyLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Root scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Process an uploaded video and return the verified artifact.
    pub async fn process(
        &self,
        input: &[u8],
        extension: &str,
        labels: ObjectLabels,
    ) -> MediaResult<ProcessedArtifact> {
        if input.is_empty() {
            return Err(MediaError::unreadable("empty upload"));
        }

        let started = Instant::now();
        let scratch = self.create_scratch()?;
        let source_path = scratch.path().join(format!("source.{}", extension));
        tokio::fs::write(&source_path, input).await?;

        let source = self.probe(&source_path).await?;
        if source.width == 0 || source.height == 0 {
            return Err(MediaError::unreadable("source reports zero dimensions"));
        }
        if !source.has_content() {
            return Err(MediaError::unreadable("source has no decodable content"));
        }
        self.sink.emit(&PipelineEvent::SourceProbed {
            width: source.width,
            height: source.height,
            fps: source.fps,
            duration: source.duration,
        });

        let request = EncodeRequest::from_source(
            source.width,
            source.height,
            source.fps,
            labels,
            self.limits.clone(),
        )?;

        let output = scratch
            .path()
            .join(format!("processed_{}.mp4", short_id()));
        let outcome = self.run_strategies(&source_path, &request, &output).await?;

        self.sink.emit(&PipelineEvent::Completed {
            strategy: outcome.strategy,
            bytes: outcome.bytes,
            elapsed_ms: started.elapsed().as_millis(),
        });

        Ok(ProcessedArtifact {
            scratch,
            path: output,
            bytes: outcome.bytes,
            strategy: outcome.strategy,
            source,
        })
    }

    /// Try strategies in order; first verified output wins.
    async fn run_strategies(
        &self,
        source: &Path,
        request: &EncodeRequest,
        output: &Path,
    ) -> MediaResult<EncodeOutcome> {
        let mut attempts: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            let name = strategy.name();

            if !strategy.available().await {
                counter!(ATTEMPTS_METRIC, "strategy" => name, "outcome" => "unavailable")
                    .increment(1);
                self.sink
                    .emit(&PipelineEvent::StrategySkipped { strategy: name });
                attempts.push(format!("{}: unavailable", name));
                continue;
            }

            self.sink
                .emit(&PipelineEvent::StrategyStarted { strategy: name });
            let attempt_start = Instant::now();

            let result = match strategy.encode(source, request, output).await {
                Ok(()) => verify_output(output, request.limits.min_output_bytes),
                Err(e) => Err(e),
            };

            match result {
                Ok(bytes) => {
                    counter!(ATTEMPTS_METRIC, "strategy" => name, "outcome" => "success")
                        .increment(1);
                    self.sink.emit(&PipelineEvent::StrategySucceeded {
                        strategy: name,
                        elapsed_ms: attempt_start.elapsed().as_millis(),
                        bytes,
                    });
                    return Ok(EncodeOutcome {
                        strategy: name,
                        bytes,
                    });
                }
                Err(e) => {
                    counter!(ATTEMPTS_METRIC, "strategy" => name, "outcome" => "failure")
                        .increment(1);
                    let reason = e.to_string();
                    self.sink.emit(&PipelineEvent::StrategyFailed {
                        strategy: name,
                        elapsed_ms: attempt_start.elapsed().as_millis(),
                        reason: &reason,
                    });
                    attempts.push(format!("{}: {}", name, reason));

                    // Partial output must not pass the next verification.
                    let _ = tokio::fs::remove_file(output).await;

                    // Invalid input will fail every strategy the same way.
                    if e.is_input_error() {
                        return Err(e);
                    }
                }
            }
        }

        Err(MediaError::EncodingFailed(format!(
            "{}; install ffmpeg for better compatibility",
            attempts.join("; ")
        )))
    }

    async fn probe(&self, path: &Path) -> MediaResult<SourceInfo> {
        match probe_source(path).await {
            #[cfg(feature = "opencv")]
            Err(MediaError::FfprobeNotFound) => {
                tracing::debug!("ffprobe not found, probing with OpenCV");
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || crate::probe::probe_with_opencv(&path))
                    .await
                    .map_err(|e| MediaError::internal(format!("probe task panicked: {}", e)))?
            }
            other => other,
        }
    }

    fn create_scratch(&self) -> MediaResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(scratch)
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::MockEncoderStrategy;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<String>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: &PipelineEvent<'_>) {
            let tag = match event {
                PipelineEvent::SourceProbed { .. } => "probed".to_string(),
                PipelineEvent::StrategyStarted { strategy } => format!("started:{}", strategy),
                PipelineEvent::StrategySucceeded { strategy, .. } => {
                    format!("succeeded:{}", strategy)
                }
                PipelineEvent::StrategyFailed { strategy, .. } => format!("failed:{}", strategy),
                PipelineEvent::StrategySkipped { strategy } => format!("skipped:{}", strategy),
                PipelineEvent::Completed { strategy, .. } => format!("completed:{}", strategy),
            };
            self.0.lock().unwrap().push(tag);
        }
    }

    fn succeeding(name: &'static str) -> MockEncoderStrategy {
        let mut mock = MockEncoderStrategy::new();
        mock.expect_name().return_const(name);
        mock.expect_available().returning(|| true);
        mock.expect_encode().returning(|_, _, output| {
            std::fs::write(output, vec![0u8; 4096]).unwrap();
            Ok(())
        });
        mock
    }

    fn failing(name: &'static str) -> MockEncoderStrategy {
        let mut mock = MockEncoderStrategy::new();
        mock.expect_name().return_const(name);
        mock.expect_available().returning(|| true);
        mock.expect_encode()
            .returning(|_, _, _| Err(MediaError::internal("boom")));
        mock
    }

    fn unavailable(name: &'static str) -> MockEncoderStrategy {
        let mut mock = MockEncoderStrategy::new();
        mock.expect_name().return_const(name);
        mock.expect_available().returning(|| false);
        mock
    }

    fn request() -> EncodeRequest {
        EncodeRequest::from_source(
            640,
            360,
            30.0,
            ObjectLabels::new(),
            SafetyLimits::default(),
        )
        .unwrap()
    }

    fn paths(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let source = dir.path().join("source.mp4");
        std::fs::write(&source, b"not a real video").unwrap();
        (source, dir.path().join("out.mp4"))
    }

    #[tokio::test]
    async fn first_available_strategy_wins() {
        let dir = tempfile::tempdir().unwrap();
        let (source, output) = paths(&dir);

        let pipeline = Pipeline::new()
            .with_strategies(vec![Box::new(succeeding("a")), Box::new(failing("b"))]);

        let outcome = pipeline
            .run_strategies(&source, &request(), &output)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "a");
        assert_eq!(outcome.bytes, 4096);
    }

    #[tokio::test]
    async fn falls_back_when_first_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (source, output) = paths(&dir);
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));

        let pipeline = Pipeline::new()
            .with_strategies(vec![Box::new(unavailable("a")), Box::new(succeeding("b"))])
            .with_sink(sink.clone());

        let outcome = pipeline
            .run_strategies(&source, &request(), &output)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "b");

        let events = sink.0.lock().unwrap();
        assert_eq!(events.as_slice(), ["skipped:a", "started:b", "succeeded:b"]);
    }

    #[tokio::test]
    async fn falls_back_when_first_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (source, output) = paths(&dir);

        let pipeline = Pipeline::new()
            .with_strategies(vec![Box::new(failing("a")), Box::new(succeeding("b"))]);

        let outcome = pipeline
            .run_strategies(&source, &request(), &output)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "b");
    }

    #[tokio::test]
    async fn undersized_output_triggers_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (source, output) = paths(&dir);

        let mut tiny = MockEncoderStrategy::new();
        tiny.expect_name().return_const("tiny");
        tiny.expect_available().returning(|| true);
        tiny.expect_encode().returning(|_, _, output| {
            std::fs::write(output, vec![0u8; 10]).unwrap();
            Ok(())
        });

        let pipeline =
            Pipeline::new().with_strategies(vec![Box::new(tiny), Box::new(succeeding("b"))]);

        let outcome = pipeline
            .run_strategies(&source, &request(), &output)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "b");
        // The verified output came from b, not the 10-byte leftover.
        assert_eq!(std::fs::metadata(&output).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn exhaustion_reports_all_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let (source, output) = paths(&dir);

        let pipeline = Pipeline::new()
            .with_strategies(vec![Box::new(failing("a")), Box::new(unavailable("b"))]);

        let err = pipeline
            .run_strategies(&source, &request(), &output)
            .await
            .unwrap_err();
        match err {
            MediaError::EncodingFailed(msg) => {
                assert!(msg.contains("a: "));
                assert!(msg.contains("b: unavailable"));
                assert!(msg.contains("install ffmpeg"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn input_error_short_circuits_remaining_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let (source, output) = paths(&dir);

        let mut unreadable = MockEncoderStrategy::new();
        unreadable.expect_name().return_const("a");
        unreadable.expect_available().returning(|| true);
        unreadable
            .expect_encode()
            .returning(|_, _, _| Err(MediaError::unreadable("bad container")));

        let mut never_called = MockEncoderStrategy::new();
        never_called.expect_name().return_const("b");
        never_called.expect_available().times(0);
        never_called.expect_encode().times(0);

        let pipeline = Pipeline::new()
            .with_strategies(vec![Box::new(unreadable), Box::new(never_called)]);

        let err = pipeline
            .run_strategies(&source, &request(), &output)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnreadableSource(_)));
    }

    #[tokio::test]
    async fn empty_upload_leaves_no_scratch_dirs() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new().with_scratch_root(root.path());

        let err = pipeline
            .process(&[], "mp4", ObjectLabels::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnreadableSource(_)));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_probe_leaves_no_scratch_dirs() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new().with_scratch_root(root.path());

        // Garbage bytes cannot be probed as video.
        let result = pipeline
            .process(b"definitely not an mp4", "mp4", ObjectLabels::new())
            .await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn short_ids_are_eight_hex_chars() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
