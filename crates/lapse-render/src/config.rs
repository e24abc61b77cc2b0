//! Render configuration.

use std::path::PathBuf;
use std::time::Duration;

use lapse_models::EncodingConfig;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Directory rendered timelapses (and concat lists) are written to
    pub output_dir: PathBuf,
    /// Maximum number of FFmpeg renders running at once
    pub max_concurrent_renders: usize,
    /// Per-render timeout, measured from admission
    pub render_timeout: Duration,
    /// How long shutdown waits for in-flight renders to settle
    pub shutdown_timeout: Duration,
    /// Output encoding settings
    pub encoding: EncodingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp/focuslapse/outputs"),
            max_concurrent_renders: 2,
            render_timeout: Duration::from_secs(1800), // 30 minutes
            shutdown_timeout: Duration::from_secs(30),
            encoding: EncodingConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let encoding = defaults.encoding.clone();

        let preset = std::env::var("RENDER_PRESET").unwrap_or_else(|_| encoding.preset.clone());
        let crf = env_parse("RENDER_CRF").unwrap_or(encoding.crf);
        let font_size = env_parse("RENDER_OVERLAY_FONT_SIZE").unwrap_or(encoding.overlay_font_size);

        Self {
            output_dir: std::env::var("RENDER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            max_concurrent_renders: env_parse::<usize>("RENDER_MAX_CONCURRENT")
                .unwrap_or(defaults.max_concurrent_renders)
                .max(1),
            render_timeout: env_parse("RENDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            shutdown_timeout: env_parse("RENDER_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            encoding: encoding
                .with_preset(preset)
                .with_crf(crf)
                .with_overlay_font_size(font_size),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_max_concurrent_renders(mut self, max: usize) -> Self {
        self.max_concurrent_renders = max.max(1);
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
