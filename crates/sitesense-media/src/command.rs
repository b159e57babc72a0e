//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use sitesense_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};

/// Number of trailing stderr lines kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 40;

/// Timeout for the one-off `ffmpeg -version` availability probe.
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "warning".to_string(),
        }
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter chain.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Apply encoding parameters.
    pub fn encoding(self, config: &EncodingConfig) -> Self {
        self.output_args(config.to_ffmpeg_args())
    }

    /// Cap output duration in seconds.
    pub fn duration_cap(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Cap output frame rate.
    pub fn fps_cap(self, fps: f64) -> Self {
        self.output_arg("-r").output_arg(format!("{}", fps))
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with a bounded wall-clock timeout.
#[derive(Debug, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command to completion.
    ///
    /// A timeout kills the child process and returns `MediaError::Timeout`;
    /// a non-zero exit returns `MediaError::FfmpegFailed` carrying the tail
    /// of stderr.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Drain stderr concurrently so the child never blocks on a full pipe;
        // keep the tail for diagnostics.
        let tail_handle = tokio::spawn(async move {
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = reader.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        });

        let wait_result = self.wait_for_completion(&mut child).await;
        let tail = tail_handle.await.unwrap_or_default();

        match wait_result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(tail.join("\n")),
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_completion(
        &self,
        child: &mut Child,
    ) -> MediaResult<std::process::ExitStatus> {
        match self.timeout_secs {
            Some(timeout_secs) => {
                let timeout =
                    tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait());
                match timeout.await {
                    Ok(result) => Ok(result?),
                    Err(_) => {
                        warn!(
                            "FFmpeg timed out after {} seconds, killing process",
                            timeout_secs
                        );
                        let _ = child.kill().await;
                        Err(MediaError::Timeout(timeout_secs))
                    }
                }
            }
            None => Ok(child.wait().await?),
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

static FFMPEG_AVAILABLE: OnceCell<bool> = OnceCell::const_new();

/// Whether a working `ffmpeg` binary is on this host.
///
/// Probed once per process with a short version-check invocation; absence is
/// expected on some hosts and triggers the frame-loop fallback rather than
/// an error.
pub async fn ffmpeg_available() -> bool {
    *FFMPEG_AVAILABLE
        .get_or_init(|| async {
            let probe = Command::new("ffmpeg")
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status();

            match tokio::time::timeout(VERSION_PROBE_TIMEOUT, probe).await {
                Ok(Ok(status)) => status.success(),
                Ok(Err(_)) | Err(_) => false,
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .video_filter("scale=640:360")
            .duration_cap(300.0)
            .fps_cap(30.0);

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-vf".to_string()));
        assert!(args.contains(&"scale=640:360".to_string()));
        assert!(args.contains(&"-t".to_string()));
        assert!(args.contains(&"300.000".to_string()));
        assert!(args.contains(&"-r".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_encoding_args_applied() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4").encoding(&EncodingConfig::default());

        let args = cmd.build_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn availability_checks_match_path_lookup() {
        assert_eq!(check_ffmpeg().is_ok(), which::which("ffmpeg").is_ok());
        assert_eq!(check_ffprobe().is_ok(), which::which("ffprobe").is_ok());
    }

    #[test]
    fn test_input_precedes_output_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4").output_arg("-an");
        let args = cmd.build_args();

        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        let an_pos = args.iter().position(|a| a == "-an").unwrap();
        assert!(input_pos < an_pos);
    }
}
