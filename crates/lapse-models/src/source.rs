//! Registered source media.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifier of an uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    /// Generate a new random source ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of media a source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A recorded video
    Video,
    /// A single still image
    Photo,
}

impl SourceKind {
    const VIDEO_EXTENSIONS: &'static [&'static str] = &["webm", "mp4", "mov"];
    const PHOTO_EXTENSIONS: &'static [&'static str] = &["jpg", "jpeg", "png", "heic", "webp"];

    /// Classify a file by extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        if Self::VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if Self::PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Photo)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Video => "video",
            SourceKind::Photo => "photo",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered source file and its cached probe values.
///
/// `total_frames` and `duration_seconds` are `0` until probed. Once both
/// are positive they are authoritative and the file is not probed again.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceDescriptor {
    pub id: SourceId,
    pub path: PathBuf,
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    pub total_frames: u64,
    pub duration_seconds: f64,
    pub registered_at: DateTime<Utc>,
}

impl SourceDescriptor {
    pub fn new(id: SourceId, path: impl AsRef<Path>, kind: SourceKind) -> Self {
        Self {
            id,
            path: path.as_ref().to_path_buf(),
            kind,
            original_filename: None,
            total_frames: 0,
            duration_seconds: 0.0,
            registered_at: Utc::now(),
        }
    }

    pub fn with_original_filename(mut self, name: impl Into<String>) -> Self {
        self.original_filename = Some(name.into());
        self
    }

    /// Whether probe values have been cached.
    pub fn is_probed(&self) -> bool {
        self.total_frames > 0 && self.duration_seconds > 0.0
    }

    /// Cache probe values. Ignored once the descriptor is already probed
    /// or when the values are not both positive.
    pub fn cache_probe(&mut self, total_frames: u64, duration_seconds: f64) -> bool {
        if self.is_probed() || total_frames == 0 || duration_seconds <= 0.0 {
            return false;
        }
        self.total_frames = total_frames;
        self.duration_seconds = duration_seconds;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(SourceKind::from_extension("mp4"), Some(SourceKind::Video));
        assert_eq!(SourceKind::from_extension(".WEBM"), Some(SourceKind::Video));
        assert_eq!(SourceKind::from_extension("jpeg"), Some(SourceKind::Photo));
        assert_eq!(SourceKind::from_extension("avi"), None);
    }

    #[test]
    fn test_probe_cache_is_write_once() {
        let mut source = SourceDescriptor::new(SourceId::new(), "/tmp/a.mp4", SourceKind::Video);
        assert!(!source.is_probed());

        assert!(!source.cache_probe(0, 10.0));
        assert!(source.cache_probe(300, 10.0));
        assert!(source.is_probed());

        assert!(!source.cache_probe(900, 30.0));
        assert_eq!(source.total_frames, 300);
        assert!((source.duration_seconds - 10.0).abs() < f64::EPSILON);
    }
}
