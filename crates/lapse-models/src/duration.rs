//! Requested output durations and client recording hints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;

/// Target length of a rendered timelapse, restricted to the durations the
/// clients offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "i64", into = "u32")]
pub struct OutputDuration(u32);

impl OutputDuration {
    /// Accepted durations in seconds.
    pub const ALLOWED: &'static [u32] = &[15, 30, 45, 60, 90, 120];

    /// Validate a duration in seconds.
    pub fn new(seconds: i64) -> Result<Self, ModelError> {
        Self::ALLOWED
            .iter()
            .copied()
            .find(|allowed| i64::from(*allowed) == seconds)
            .map(Self)
            .ok_or(ModelError::InvalidOutputSeconds(seconds))
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for OutputDuration {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OutputDuration> for u32 {
    fn from(value: OutputDuration) -> Self {
        value.0
    }
}

impl fmt::Display for OutputDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Client-measured recording length.
///
/// Some client timers report `0` when they lost track of the session; that
/// value means "unknown" and is never used as an override for probing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RecordingHint {
    #[default]
    Unknown,
    Seconds(f64),
}

impl RecordingHint {
    /// Interpret a raw client value. Zero, negative and non-finite values are unknown.
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self::Seconds(seconds)
        } else {
            Self::Unknown
        }
    }

    /// Frame estimate at the given frame rate, if the hint is usable.
    pub fn estimated_frames(&self, fps: u32) -> Option<u64> {
        match self {
            Self::Seconds(seconds) => Some((seconds * f64::from(fps)).round() as u64),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Seconds(_))
    }
}
