//! Render job execution.
//!
//! A job owns exactly one transcoder invocation and is the only writer of
//! its task after creation. Whatever happens inside the render (errors,
//! timeouts, cancellation or a panic) ends with the task settled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lapse_media::{FfmpegCommand, MediaError, Transcoder};
use lapse_models::TaskId;
use tokio::sync::watch;
use tracing::{debug, Instrument};

use crate::error::{RenderError, RenderResult};
use crate::logging::TaskLogger;
use crate::metrics;
use crate::pool::{Admission, CancelTokens};
use crate::store::TaskStore;

/// A concat demuxer list written before the transcoder starts.
#[derive(Debug, Clone)]
pub struct ConcatList {
    pub path: PathBuf,
    pub contents: String,
}

/// Everything needed to render and settle one task.
pub struct RenderJob {
    pub task_id: TaskId,
    pub command: FfmpegCommand,
    pub concat_list: Option<ConcatList>,
    pub timeout: Duration,
    pub store: TaskStore,
    pub transcoder: Arc<dyn Transcoder>,
    pub tokens: CancelTokens,
    pub logger: TaskLogger,
}

impl RenderJob {
    /// Run after admission and settle the task. Never panics outward.
    pub async fn run(self, admission: Admission, cancel: watch::Receiver<bool>) {
        let span = self.logger.create_span();
        let store = self.store.clone();
        let tokens = self.tokens.clone();
        let logger = self.logger.clone();
        let task_id = self.task_id.clone();
        let output = self.command.output().to_path_buf();
        let concat_path = self.concat_list.as_ref().map(|list| list.path.clone());
        let started = Instant::now();

        let outcome = match admission {
            Admission::Withdrawn => Err(RenderError::Media(MediaError::Cancelled)),
            Admission::Granted => {
                logger.log_start(&format!("output {}", output.display()));
                // Isolate panics from the pool
                match tokio::spawn(self.execute(cancel).instrument(span)).await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(RenderError::Media(MediaError::internal(
                        format!("render panicked: {}", panic_message(e.into_panic())),
                    ))),
                    Err(e) => Err(RenderError::Media(MediaError::internal(format!(
                        "render aborted: {}",
                        e
                    )))),
                }
            }
        };

        if let Some(path) = concat_path {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), "Concat list not removed: {}", e);
            }
        }

        match outcome {
            Ok(()) => {
                if store.complete(&task_id).await {
                    let elapsed = started.elapsed().as_secs_f64();
                    metrics::record_task_completed(logger.variant(), elapsed);
                    logger.log_completion(&format!("{:.1}s", elapsed));
                }
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(rm) = tokio::fs::remove_file(&output).await {
                    debug!(path = %output.display(), "No partial output removed: {}", rm);
                }
                if store.fail(&task_id, message.clone()).await {
                    metrics::record_task_failed(logger.variant(), failure_reason(&e));
                    logger.log_error(&message);
                }
            }
        }

        tokens.release(&task_id);
    }

    async fn execute(self, cancel: watch::Receiver<bool>) -> RenderResult<()> {
        if let Some(list) = &self.concat_list {
            tokio::fs::write(&list.path, &list.contents).await?;
            debug!(path = %list.path.display(), "Wrote concat list");
        }

        let transcode = self.transcoder.transcode(&self.command, cancel);
        tokio::pin!(transcode);

        tokio::select! {
            result = &mut transcode => result?,
            _ = tokio::time::sleep(self.timeout) => {
                self.logger.log_warning("timed out, cancelling transcoder");
                self.tokens.signal(&self.task_id);
                // Let the transcoder tear down its process group
                let _ = transcode.await;
                return Err(MediaError::Timeout(self.timeout.as_secs()).into());
            }
        }

        let output = self.command.output();
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(MediaError::MissingOutput(output.to_path_buf()).into());
        }

        Ok(())
    }
}

fn failure_reason(error: &RenderError) -> &'static str {
    match error {
        RenderError::Media(MediaError::Cancelled) => "cancelled",
        RenderError::Media(MediaError::Timeout(_)) => "timeout",
        RenderError::Media(MediaError::MissingOutput(_)) => "missing_output",
        RenderError::Media(MediaError::FfmpegFailed { .. }) => "transcoder",
        RenderError::Media(MediaError::Internal(_)) => "internal",
        _ => "other",
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
