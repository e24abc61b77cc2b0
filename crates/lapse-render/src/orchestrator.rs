//! Render orchestration.
//!
//! Turns a render request into a registered task and a queued render job:
//! resolve sources, obtain frame counts, plan sampling, resolve geometry,
//! build the filter pipeline and submit the job. Task creation returns as
//! soon as the job is queued.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use lapse_media::{
    FfmpegCommand, FfmpegTranscoder, FilterPipeline, GeometryProfile, Prober, SamplingPlan,
    Transcoder, BASE_FPS,
};
use lapse_models::{
    AspectRatio, OutputDuration, RecordingHint, RenderTask, RenderVariant, SourceDescriptor,
    SourceId, SourceKind, TaskId,
};
use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::job::{ConcatList, RenderJob};
use crate::logging::TaskLogger;
use crate::metrics;
use crate::pool::{CancelTokens, RenderPool};
use crate::registry::SourceRegistry;
use crate::store::TaskStore;

/// A request to render one or more recorded videos.
#[derive(Debug, Clone)]
pub struct CreateTaskRequest {
    /// Sources in playback order
    pub source_ids: Vec<SourceId>,
    pub output: OutputDuration,
    pub aspect_ratio: AspectRatio,
    pub recording_hint: RecordingHint,
}

/// Owns the task store and the render pool.
pub struct RenderOrchestrator {
    config: RenderConfig,
    store: TaskStore,
    registry: Arc<dyn SourceRegistry>,
    prober: Prober,
    transcoder: Arc<dyn Transcoder>,
    pool: RenderPool,
    tokens: CancelTokens,
    shutting_down: AtomicBool,
    /// Dispatch holds it shared and shutdown exclusively, so no task is
    /// registered between the shutdown flag and the cancel sweep.
    admission: RwLock<()>,
}

impl RenderOrchestrator {
    pub fn new(
        config: RenderConfig,
        store: TaskStore,
        registry: Arc<dyn SourceRegistry>,
        prober: Prober,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let pool = RenderPool::new(config.max_concurrent_renders);
        info!(
            "Render orchestrator ready with {} render slots, output in {}",
            pool.size(),
            config.output_dir.display()
        );

        Self {
            config,
            store,
            registry,
            prober,
            transcoder,
            pool,
            tokens: CancelTokens::new(),
            shutting_down: AtomicBool::new(false),
            admission: RwLock::new(()),
        }
    }

    /// Orchestrator with the FFprobe chain and the FFmpeg transcoder.
    pub fn with_ffmpeg(config: RenderConfig, registry: Arc<dyn SourceRegistry>) -> Self {
        Self::new(
            config,
            TaskStore::new(),
            registry,
            Prober::default(),
            Arc::new(FfmpegTranscoder),
        )
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Create a video timelapse task and queue its render.
    pub async fn create_task(&self, request: CreateTaskRequest) -> RenderResult<TaskId> {
        self.ensure_accepting()?;
        let sources = self.resolve_sources(&request.source_ids, SourceKind::Video).await?;

        let total_frames = self.total_frames(&sources, request.recording_hint).await;
        let desired = request.output.seconds();
        let plan = SamplingPlan::compute(i64::try_from(total_frames).unwrap_or(i64::MAX), desired);
        metrics::record_sampling_plan(plan.case_label());

        info!(
            sources = sources.len(),
            total_frames,
            desired_seconds = desired,
            case = plan.case_label(),
            interval = plan.sampling_interval(),
            output_fps = plan.output_fps(),
            "Computed sampling plan"
        );

        let geometry = GeometryProfile::for_ratio(request.aspect_ratio);
        let filters = FilterPipeline::for_video(&plan, geometry, self.config.encoding.overlay_font_size);

        let task_id = TaskId::new();
        let output_path = self.output_path(&task_id);

        let (input, concat_list) = match sources.as_slice() {
            [single] => (single.path.clone(), None),
            many => {
                let list = ConcatList {
                    path: self.concat_list_path(&task_id),
                    contents: video_concat_list(many),
                };
                (list.path.clone(), Some(list))
            }
        };

        let command = self.build_command(&input, &output_path, concat_list.is_some(), &filters, plan.output_fps());
        let task = RenderTask::new(
            task_id.clone(),
            request.source_ids,
            RenderVariant::Video,
            request.output,
            request.aspect_ratio,
            &output_path,
        )
        .with_actual_output_seconds(plan.actual_output_seconds());

        self.dispatch(task, command, concat_list).await?;
        Ok(task_id)
    }

    /// Create a photo-sequence task: every still is one frame at [`BASE_FPS`].
    pub async fn create_task_from_photos(
        &self,
        source_ids: Vec<SourceId>,
        output: OutputDuration,
        aspect_ratio: AspectRatio,
    ) -> RenderResult<TaskId> {
        self.ensure_accepting()?;
        let sources = self.resolve_sources(&source_ids, SourceKind::Photo).await?;

        let photo_seconds = (sources.len() as u32 / BASE_FPS).max(1);
        let actual = (photo_seconds != output.seconds()).then_some(photo_seconds);

        let task_id = TaskId::new();
        let output_path = self.output_path(&task_id);
        let list = ConcatList {
            path: self.concat_list_path(&task_id),
            contents: photo_concat_list(&sources),
        };

        let filters = FilterPipeline::for_photos(
            GeometryProfile::for_ratio(aspect_ratio),
            self.config.encoding.overlay_font_size,
        );
        let command = self.build_command(&list.path, &output_path, true, &filters, BASE_FPS);

        debug!(photos = sources.len(), output_seconds = photo_seconds, "Photo sequence planned");

        let task = RenderTask::new(
            task_id.clone(),
            source_ids,
            RenderVariant::Photos,
            output,
            aspect_ratio,
            &output_path,
        )
        .with_actual_output_seconds(actual);

        self.dispatch(task, command, Some(list)).await?;
        Ok(task_id)
    }

    /// Snapshot of a task.
    pub async fn get_task(&self, task_id: &TaskId) -> RenderResult<RenderTask> {
        self.store
            .get(task_id)
            .await
            .ok_or_else(|| RenderError::TaskNotFound(task_id.clone()))
    }

    /// Request cancellation. Returns `false` when the task already settled.
    pub async fn cancel_task(&self, task_id: &TaskId) -> RenderResult<bool> {
        let task = self.get_task(task_id).await?;
        if task.is_terminal() {
            return Ok(false);
        }
        let signalled = self.tokens.signal(task_id);
        if signalled {
            info!(task_id = %task_id, "Cancellation requested");
        }
        Ok(signalled)
    }

    /// Stop accepting tasks, cancel in-flight renders and wait for them to
    /// settle within the configured shutdown timeout.
    pub async fn shutdown(&self) -> bool {
        let cancelled = {
            let _gate = self.admission.write().await;
            if self.shutting_down.swap(true, Ordering::SeqCst) {
                return true;
            }
            self.tokens.signal_all()
        };
        info!("Shutting down render orchestrator, cancelled {} renders", cancelled);
        self.pool.drain(self.config.shutdown_timeout).await
    }

    fn ensure_accepting(&self) -> RenderResult<()> {
        if self.is_shutting_down() {
            return Err(RenderError::ShuttingDown);
        }
        Ok(())
    }

    async fn resolve_sources(
        &self,
        source_ids: &[SourceId],
        expected: SourceKind,
    ) -> RenderResult<Vec<SourceDescriptor>> {
        if source_ids.is_empty() {
            return Err(RenderError::invalid_parameter("at least one source is required"));
        }

        let mut sources = Vec::with_capacity(source_ids.len());
        for id in source_ids {
            let source = self
                .registry
                .get(id)
                .await
                .ok_or_else(|| RenderError::SourceNotFound(id.clone()))?;
            if source.kind != expected {
                return Err(RenderError::invalid_parameter(format!(
                    "source {} is a {}, expected a {}",
                    id, source.kind, expected
                )));
            }
            sources.push(source);
        }
        Ok(sources)
    }

    /// Sum of source frame counts, probing (and caching) unprobed sources.
    /// If any source stays unknown, a usable recording hint replaces the sum.
    async fn total_frames(&self, sources: &[SourceDescriptor], hint: RecordingHint) -> u64 {
        let mut total = 0u64;
        let mut unknown = 0usize;

        for source in sources {
            if source.is_probed() {
                total += source.total_frames;
                continue;
            }

            let probe = self.prober.probe(&source.path).await;
            if probe.is_known() {
                self.registry.record_probe(&source.id, probe).await;
                total += probe.total_frames;
            } else {
                unknown += 1;
            }
        }

        if unknown == 0 {
            return total;
        }

        match hint.estimated_frames(BASE_FPS) {
            Some(estimate) => {
                warn!(unknown, estimate, "Probe inconclusive, using recording hint");
                estimate
            }
            None => {
                warn!(unknown, known_frames = total, "Probe inconclusive and no recording hint");
                total
            }
        }
    }

    fn build_command(
        &self,
        input: &Path,
        output: &Path,
        concat: bool,
        filters: &FilterPipeline,
        fps: u32,
    ) -> FfmpegCommand {
        let encoding = &self.config.encoding;
        let mut cmd = FfmpegCommand::new(input, output);
        if concat {
            cmd = cmd.concat_list();
        }
        cmd.video_filter(filters.to_filter_string())
            .frame_rate(fps)
            .no_audio()
            .video_codec(&encoding.codec)
            .preset(&encoding.preset)
            .crf(encoding.crf)
            .pixel_format(&encoding.pixel_format)
            .faststart()
    }

    async fn dispatch(
        &self,
        task: RenderTask,
        command: FfmpegCommand,
        concat_list: Option<ConcatList>,
    ) -> RenderResult<()> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        // Probing may have outlasted the start of a shutdown
        let _gate = self.admission.read().await;
        self.ensure_accepting()?;

        let task_id = task.task_id.clone();
        let logger = TaskLogger::new(&task_id, task.variant);
        let cancel = self.tokens.issue(&task_id);

        self.store.insert(task).await;
        metrics::record_task_created(logger.variant());
        logger.log_progress("queued");

        let job = RenderJob {
            task_id: task_id.clone(),
            command,
            concat_list,
            timeout: self.config.render_timeout,
            store: self.store.clone(),
            transcoder: Arc::clone(&self.transcoder),
            tokens: self.tokens.clone(),
            logger,
        };

        let job_cancel = cancel.clone();
        let accepted = self
            .pool
            .submit(cancel, move |admission| job.run(admission, job_cancel))
            .await;
        if !accepted {
            self.store.fail(&task_id, "Render pool is shutting down").await;
            self.tokens.release(&task_id);
            return Err(RenderError::ShuttingDown);
        }
        Ok(())
    }

    fn output_path(&self, task_id: &TaskId) -> PathBuf {
        self.config.output_dir.join(format!("timelapse_{}.mp4", task_id))
    }

    fn concat_list_path(&self, task_id: &TaskId) -> PathBuf {
        self.config.output_dir.join(format!("timelapse_{}.txt", task_id))
    }
}

/// Concat demuxer entry with single quotes escaped.
fn concat_entry(path: &Path) -> String {
    format!("file '{}'\n", path.to_string_lossy().replace('\'', "'\\''"))
}

fn video_concat_list(sources: &[SourceDescriptor]) -> String {
    sources.iter().map(|s| concat_entry(&s.path)).collect()
}

/// One `1/BASE_FPS` second entry per photo. The last file is repeated
/// because the demuxer ignores the final duration directive.
fn photo_concat_list(sources: &[SourceDescriptor]) -> String {
    let frame = 1.0 / f64::from(BASE_FPS);
    let mut list = String::new();
    for source in sources {
        list.push_str(&concat_entry(&source.path));
        list.push_str(&format!("duration {:.6}\n", frame));
    }
    if let Some(last) = sources.last() {
        list.push_str(&concat_entry(&last.path));
    }
    list
}
