//! Shared data models for the timelapse render backend.
//!
//! This crate provides Serde-serializable types for:
//! - Registered source media (videos and photos)
//! - Render tasks and their lifecycle
//! - Output aspect ratios and durations accepted by the API
//! - Encoding configuration

pub mod aspect;
pub mod duration;
pub mod encoding;
pub mod error;
pub mod source;
pub mod task;

// Re-export common types
pub use aspect::AspectRatio;
pub use duration::{OutputDuration, RecordingHint};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use source::{SourceDescriptor, SourceId, SourceKind};
pub use task::{RenderTask, RenderVariant, TaskId, TaskStatus};
