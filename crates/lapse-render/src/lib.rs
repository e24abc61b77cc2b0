//! Timelapse render orchestration.
//!
//! This crate provides:
//! - The in-process task store and source registry
//! - A bounded render pool with a FIFO admission queue
//! - Render jobs with timeout, cancellation and panic isolation
//! - The orchestrator tying probing, sampling, geometry and rendering together

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod registry;
pub mod store;

pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use logging::TaskLogger;
pub use orchestrator::{CreateTaskRequest, RenderOrchestrator};
pub use pool::{Admission, CancelTokens, RenderPool};
pub use registry::{InMemorySourceRegistry, SourceRegistry};
pub use store::TaskStore;
