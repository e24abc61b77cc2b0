//! Source registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lapse_media::ProbeResult;
use lapse_models::{SourceDescriptor, SourceId, SourceKind};
use tokio::sync::RwLock;
use tracing::debug;

/// Lookup of registered sources. The orchestrator only reads entries and
/// caches probe values on them.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn get(&self, id: &SourceId) -> Option<SourceDescriptor>;

    /// Cache a successful probe. Already-probed sources keep their values.
    async fn record_probe(&self, id: &SourceId, probe: ProbeResult);
}

/// Registry backed by a process-local map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceRegistry {
    sources: Arc<RwLock<HashMap<SourceId, SourceDescriptor>>>,
}

impl InMemorySourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under a fresh id.
    pub async fn register(
        &self,
        path: impl AsRef<Path>,
        kind: SourceKind,
        original_filename: Option<String>,
    ) -> SourceDescriptor {
        let mut source = SourceDescriptor::new(SourceId::new(), path, kind);
        if let Some(name) = original_filename {
            source = source.with_original_filename(name);
        }
        self.insert(source.clone()).await;
        source
    }

    /// Insert a descriptor as-is, replacing any entry with the same id.
    pub async fn insert(&self, source: SourceDescriptor) {
        debug!(source_id = %source.id, kind = %source.kind, "Registered source");
        self.sources.write().await.insert(source.id.clone(), source);
    }

    pub async fn len(&self) -> usize {
        self.sources.read().await.len()
    }
}

#[async_trait]
impl SourceRegistry for InMemorySourceRegistry {
    async fn get(&self, id: &SourceId) -> Option<SourceDescriptor> {
        self.sources.read().await.get(id).cloned()
    }

    async fn record_probe(&self, id: &SourceId, probe: ProbeResult) {
        if let Some(source) = self.sources.write().await.get_mut(id) {
            if source.cache_probe(probe.total_frames, probe.duration_seconds) {
                debug!(
                    source_id = %id,
                    total_frames = probe.total_frames,
                    duration_seconds = probe.duration_seconds,
                    "Cached probe values"
                );
            }
        }
    }
}
