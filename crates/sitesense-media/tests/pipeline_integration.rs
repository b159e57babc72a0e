//! End-to-end pipeline tests against a real FFmpeg binary.
//!
//! Run with:
//!   cargo test -p sitesense-media --test pipeline_integration -- --ignored

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use sitesense_media::{probe_source, EncoderStrategy, MediaError, MediaResult, Pipeline};
use sitesense_models::{EncodeRequest, ObjectLabels, LABEL_CAR, LABEL_PERSON};

/// Synthesize a short test clip with FFmpeg's testsrc generator.
fn make_test_clip(dir: &tempfile::TempDir, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.path().join("source.mp4");
    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            &format!("testsrc=duration=2:size={}x{}:rate=30", width, height),
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&path)
        .status()
        .expect("ffmpeg not runnable");
    assert!(status.success(), "test clip generation failed");
    path
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn processes_clip_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_test_clip(&dir, 640, 360);
    let bytes = std::fs::read(&source).unwrap();

    let labels: ObjectLabels = [LABEL_PERSON, LABEL_CAR].into_iter().collect();
    let artifact = Pipeline::new()
        .process(&bytes, "mp4", labels)
        .await
        .expect("pipeline failed");

    assert_eq!(artifact.strategy, "ffmpeg");
    assert!(artifact.bytes > 1000);

    let info = probe_source(artifact.path()).await.expect("probe failed");
    assert_eq!(info.width, 640);
    assert_eq!(info.height, 360);
    assert_eq!(info.codec, "h264");
    assert!(info.fps <= 30.5);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn downscales_wide_sources() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_test_clip(&dir, 1920, 1080);
    let bytes = std::fs::read(&source).unwrap();

    let artifact = Pipeline::new()
        .process(&bytes, "mp4", ObjectLabels::new())
        .await
        .expect("pipeline failed");

    let info = probe_source(artifact.path()).await.expect("probe failed");
    assert_eq!(info.width, 1280);
    assert_eq!(info.height, 720);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn artifact_drop_removes_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_test_clip(&dir, 320, 240);
    let bytes = std::fs::read(&source).unwrap();

    let artifact = Pipeline::new()
        .process(&bytes, "mp4", ObjectLabels::new())
        .await
        .expect("pipeline failed");

    let output_path = artifact.path().to_path_buf();
    assert!(output_path.exists());
    drop(artifact);
    assert!(!output_path.exists());
}

struct AlwaysFails;

#[async_trait]
impl EncoderStrategy for AlwaysFails {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn available(&self) -> bool {
        true
    }

    async fn encode(
        &self,
        _source: &Path,
        _request: &EncodeRequest,
        _output: &Path,
    ) -> MediaResult<()> {
        Err(MediaError::internal("synthetic failure"))
    }
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn strategy_exhaustion_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = make_test_clip(&dir, 320, 240);
    let bytes = std::fs::read(&source).unwrap();

    let scratch_root = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new()
        .with_scratch_root(scratch_root.path())
        .with_strategies(vec![Box::new(AlwaysFails), Box::new(AlwaysFails)]);

    let err = pipeline
        .process(&bytes, "mp4", ObjectLabels::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::EncodingFailed(_)));
    assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn garbage_input_is_unreadable() {
    let result = Pipeline::new()
        .process(&vec![0u8; 4096], "mp4", ObjectLabels::new())
        .await;

    assert!(matches!(
        result,
        Err(sitesense_media::MediaError::UnreadableSource(_))
    ));
}
