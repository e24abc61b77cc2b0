//! FFmpeg invocation: argument building and a cancellable runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One FFmpeg invocation: input options, a single input, output options and
/// a single output file. Output is always overwritten.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// A media file or a concat demuxer list
    input: PathBuf,
    output: PathBuf,
    /// Options placed before `-i`
    input_args: Vec<String>,
    /// Options placed between the input and the output path
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

    fn with_input_option(mut self, flag: &str, value: &str) -> Self {
        self.input_args.push(flag.to_string());
        self.input_args.push(value.to_string());
        self
    }

    fn with_output_option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.output_args.push(flag.to_string());
        self.output_args.push(value.into());
        self
    }

    /// Read the input as a concat demuxer list. Entries are absolute paths.
    pub fn concat_list(self) -> Self {
        self.with_input_option("-f", "concat").with_input_option("-safe", "0")
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.with_output_option("-vf", filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.with_output_option("-c:v", codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.with_output_option("-crf", crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.with_output_option("-preset", preset)
    }

    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.with_output_option("-pix_fmt", format)
    }

    /// Constant output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.with_output_option("-r", fps.to_string())
    }

    /// Timelapses never carry audio.
    pub fn no_audio(mut self) -> Self {
        self.output_args.push("-an".to_string());
        self
    }

    /// Put the MP4 index first so downloads start playing early.
    pub fn faststart(self) -> Self {
        self.with_output_option("-movflags", "+faststart")
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument list, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-nostdin", "-v", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Spawns `ffmpeg` for a command and waits for it, honouring an optional
/// cancel flag.
///
/// The child runs in its own process group so that a cancellation takes
/// down anything FFmpeg spawned as well.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Run to completion. A non-zero exit carries the last stderr lines.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut command = Command::new("ffmpeg");
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut command);

        let mut child = command.spawn()?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        // FFmpeg blocks on a full stderr pipe, so drain it the whole time
        let tail_handle = tokio::spawn(stderr_tail(stderr));

        let status = tokio::select! {
            status = child.wait() => status.map_err(MediaError::from),
            _ = cancelled(self.cancel_rx.clone()) => {
                info!("FFmpeg cancelled, killing process group");
                terminate(&mut child).await;
                Err(MediaError::Cancelled)
            }
        };
        let tail = tail_handle.await.unwrap_or_default();

        match status? {
            status if status.success() => Ok(()),
            status => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!tail.is_empty()).then_some(tail),
                status.code(),
            )),
        }
    }
}

async fn stderr_tail(stderr: ChildStderr) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// Resolves once the cancel flag is raised. Never resolves without a receiver
/// or after the sender is gone.
pub async fn cancelled(cancel_rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel_rx else {
        return std::future::pending().await;
    };

    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

async fn terminate(child: &mut Child) {
    signal_process_group(child);
    if let Err(e) = child.kill().await {
        debug!("FFmpeg kill after group signal: {}", e);
    }
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn signal_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid, "killpg failed: {}", e);
        }
    }
}

#[cfg(not(unix))]
fn signal_process_group(_child: &Child) {}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
