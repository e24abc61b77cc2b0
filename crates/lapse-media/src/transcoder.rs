//! Transcoder seam between render jobs and the FFmpeg process.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Runs a prepared command to completion.
///
/// Implementations must stop promptly once `cancel` turns `true` and
/// return [`MediaError::Cancelled`](crate::MediaError::Cancelled).
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, cmd: &FfmpegCommand, cancel: watch::Receiver<bool>) -> MediaResult<()>;
}

/// Spawns `ffmpeg` in its own process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTranscoder;

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, cmd: &FfmpegCommand, cancel: watch::Receiver<bool>) -> MediaResult<()> {
        FfmpegRunner::new().with_cancel(cancel).run(cmd).await
    }
}
