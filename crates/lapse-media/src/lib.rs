//! FFmpeg CLI wrapper and timelapse render planning.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Process-group aware execution with cancellation
//! - A pluggable FFprobe fallback chain for frame count and duration
//! - The sampling policy that fits any source length into a target duration
//! - Aspect-ratio geometry and the declarative filter pipeline

pub mod command;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod probe;
pub mod sampling;
pub mod transcoder;

pub use command::{cancelled, check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{FilterPipeline, FilterStage};
pub use geometry::{resolve, Dimensions, GeometryProfile};
pub use probe::{
    FormatMetadataStrategy, PacketCountStrategy, ProbeReading, ProbeResult, ProbeStrategy, Prober,
};
pub use sampling::{SamplingPlan, BASE_FPS, MAX_INTERVAL, MAX_OUTPUT_FPS};
pub use transcoder::{FfmpegTranscoder, Transcoder};
