//! Application state.

use std::sync::Arc;

use lapse_render::{InMemorySourceRegistry, RenderConfig, RenderOrchestrator};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub sources: Arc<InMemorySourceRegistry>,
    pub orchestrator: Arc<RenderOrchestrator>,
}

impl AppState {
    /// Create state backed by FFmpeg renders.
    pub async fn new(config: ApiConfig, render_config: RenderConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&render_config.output_dir).await?;

        let sources = Arc::new(InMemorySourceRegistry::new());
        let orchestrator = Arc::new(RenderOrchestrator::with_ffmpeg(
            render_config,
            Arc::clone(&sources) as _,
        ));

        Ok(Self::from_parts(config, sources, orchestrator))
    }

    /// Assemble state from prebuilt parts.
    pub fn from_parts(
        config: ApiConfig,
        sources: Arc<InMemorySourceRegistry>,
        orchestrator: Arc<RenderOrchestrator>,
    ) -> Self {
        Self {
            config,
            sources,
            orchestrator,
        }
    }
}
