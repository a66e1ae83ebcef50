//! FFmpeg command building, encode runner and raw-output decoder.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::{cancelled, CancelReceiver};
use crate::error::{MediaError, MediaResult, Stage};
use crate::progress::FfmpegProgress;

/// Builder for FFmpeg encode commands that write to a file.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    input_args: Vec<String>,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input seek in seconds.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Copy every stream without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Full argument list, without the `ffmpeg` program name.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs encode commands with progress, timeout and cancellation.
#[derive(Default)]
pub struct FfmpegRunner {
    cancel_rx: Option<CancelReceiver>,
    timeout_secs: Option<u64>,
}

enum Completion {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel_rx: Option<CancelReceiver>) -> Self {
        self.cancel_rx = cancel_rx;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run a command, invoking `on_progress` at the end of every progress block.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(&FfmpegProgress) + Send + 'static,
    {
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
            .ok_or_else(|| MediaError::internal(Stage::Render, None, "FFmpeg stderr not captured"))?;

        // Progress keys and error lines share stderr; keep the latter for reporting.
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = FfmpegProgress::default();
            let mut errors = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if progress.apply_line(&line) {
                    on_progress(&progress);
                } else if !line.contains('=') {
                    errors.push(line);
                }
            }
            errors.join("\n")
        });

        let completion = self.wait_for_completion(&mut child).await;
        let status = match completion {
            Completion::Exited(status) => status?,
            Completion::TimedOut => {
                let secs = self.timeout_secs.unwrap_or_default();
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                return Err(MediaError::Timeout(secs));
            }
            Completion::Cancelled => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                return Err(MediaError::Cancelled);
            }
        };

        let stderr = reader.await.unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> Completion {
        let timeout = self.timeout_secs;
        let wait = async move {
            match timeout {
                Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                    Ok(status) => Completion::Exited(status),
                    Err(_) => Completion::TimedOut,
                },
                None => Completion::Exited(child.wait().await),
            }
        };

        tokio::select! {
            completion = wait => completion,
            _ = cancelled(self.cancel_rx.clone()) => Completion::Cancelled,
        }
    }
}

/// FFmpeg process streaming raw decoded data on stdout.
///
/// Stderr is drained on a background task so a chatty decoder cannot block
/// on a full pipe while the caller is reading stdout.
pub struct PipedDecoder {
    child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<String>,
}

/// How a [`PipedDecoder`] ended.
#[derive(Debug)]
pub struct DecoderExit {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

impl PipedDecoder {
    /// Spawn `ffmpeg -i <input> <output_args> pipe:1`.
    pub fn spawn(input: &Path, output_args: &[String], stage: Stage) -> MediaResult<Self> {
        check_ffmpeg()?;
        debug!(
            stage = %stage,
            "Running FFmpeg: ffmpeg -i {} {} pipe:1",
            input.display(),
            output_args.join(" ")
        );

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-nostdin", "-v", "error", "-i"])
            .arg(input)
            .args(output_args)
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal(stage, None, "FFmpeg stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal(stage, None, "FFmpeg stderr not captured"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        Ok(Self {
            child,
            stdout,
            stderr_task,
        })
    }

    pub fn stdout(&mut self) -> &mut ChildStdout {
        &mut self.stdout
    }

    /// Wait for exit after stdout reached EOF.
    pub async fn finish(mut self) -> MediaResult<DecoderExit> {
        drop(self.stdout);
        let status = self.child.wait().await?;
        let stderr = self.stderr_task.await.unwrap_or_default();
        Ok(DecoderExit {
            success: status.success(),
            code: status.code(),
            stderr: stderr.trim().to_string(),
        })
    }

    /// Kill the process without waiting for output.
    pub async fn abort(mut self) {
        let _ = self.child.kill().await;
        self.stderr_task.abort();
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
