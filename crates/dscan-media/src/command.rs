//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of FFmpeg diagnostic lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;
/// FFmpeg `-v` level; only errors reach the stderr tail
const LOG_LEVEL: &str = "error";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
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

    /// Force the output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(8 + self.output_args.len());

        args.push("-y".to_string());
        args.push("-v".to_string());
        args.push(LOG_LEVEL.to_string());

        // Progress goes to stderr next to diagnostics
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostdin".to_string());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());

        args
    }
}

/// Runs FFmpeg commands against an explicit binary with a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve the configured binary, failing if it is not executable.
    pub fn check_binary(&self) -> MediaResult<PathBuf> {
        which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound(self.binary.clone()))
    }

    /// Run a command to completion.
    ///
    /// The child is killed if the timeout elapses or the returned future is
    /// dropped.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<FfmpegProgress> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MediaError::FfmpegNotFound(self.binary.clone()),
                _ => MediaError::Io(e),
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr was not captured"))?;

        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = lines.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                        trace!(
                            frame = snapshot.frame,
                            out_time_ms = snapshot.out_time_ms,
                            speed = snapshot.speed,
                            "FFmpeg progress"
                        );
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }

            (progress, tail)
        });

        let result = self.wait_for_completion(&mut child).await;

        let (progress, tail) = reader_handle
            .await
            .map_err(|e| MediaError::internal(format!("FFmpeg stderr reader failed: {}", e)))?;

        match result {
            Ok(()) => Ok(progress),
            Err(MediaError::FfmpegFailed {
                message, exit_code, ..
            }) => {
                let stderr = (!tail.is_empty()).then(|| Vec::from(tail).join("\n"));
                Err(MediaError::ffmpeg_failed(message, stderr, exit_code))
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("FFmpeg timed out after {:?}, killing process", timeout);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill FFmpeg: {}", e);
                    }
                    return Err(MediaError::Timeout(timeout.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_layout() {
        let cmd = FfmpegCommand::new("in.mov", "out.mp4")
            .output_args(["-c:v", "libx264"])
            .format("mp4");

        let args = cmd.build_args();
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        let codec_pos = args.iter().position(|a| a == "-c:v").unwrap();

        assert_eq!(args[0], "-y");
        assert_eq!(args[input_pos + 1], "in.mov");
        assert!(codec_pos > input_pos);
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "mp4"));
        assert!(args.windows(2).any(|w| w[0] == "-v" && w[1] == "error"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = FfmpegRunner::new("/nonexistent/bin/ffmpeg");
        let cmd = FfmpegCommand::new("in.mov", "out.mp4");

        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound(_)));
        assert!(runner.check_binary().is_err());
    }
}
