//! FFprobe frame count and duration measurement.
//!
//! Browser and phone recorders frequently write containers without a
//! duration or frame count, so measurement is an ordered chain of
//! strategies. Cheap container metadata is tried first; counting the
//! packets of the video stream is the slower, exact fallback.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};
use crate::sampling::{BASE_FPS, MAX_OUTPUT_FPS};

/// Frame count and duration of a source. `(0, 0.0)` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeResult {
    pub total_frames: u64,
    pub duration_seconds: f64,
}

impl ProbeResult {
    pub const UNKNOWN: ProbeResult = ProbeResult {
        total_frames: 0,
        duration_seconds: 0.0,
    };

    pub fn new(total_frames: u64, duration_seconds: f64) -> Self {
        Self {
            total_frames,
            duration_seconds,
        }
    }

    pub fn is_known(&self) -> bool {
        self.total_frames > 0 && self.duration_seconds > 0.0
    }
}

/// Partial measurement produced by one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeReading {
    pub frames: Option<u64>,
    pub duration: Option<f64>,
    pub fps: Option<f64>,
}

impl ProbeReading {
    /// Fill fields that are still missing from another reading.
    /// Non-positive values never count as a measurement.
    pub fn merge(&mut self, other: ProbeReading) {
        if self.frames.is_none() {
            self.frames = other.frames.filter(|f| *f > 0);
        }
        if self.duration.is_none() {
            self.duration = other.duration.filter(|d| d.is_finite() && *d > 0.0);
        }
        if self.fps.is_none() {
            self.fps = other.fps.filter(|f| f.is_finite() && *f > 0.0);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.frames.is_some() && self.duration.is_some()
    }

    /// Turn the reading into a result, deriving a missing frame count or
    /// duration from the frame rate (measured, else `assumed_fps`).
    pub fn resolve(&self, assumed_fps: f64) -> ProbeResult {
        let fps = self.fps.unwrap_or(assumed_fps);
        match (self.frames, self.duration) {
            (Some(frames), Some(duration)) => ProbeResult::new(frames, duration),
            (Some(frames), None) if fps > 0.0 => ProbeResult::new(frames, frames as f64 / fps),
            (None, Some(duration)) => {
                let frames = (duration * fps).round() as u64;
                if frames > 0 {
                    ProbeResult::new(frames, duration)
                } else {
                    ProbeResult::UNKNOWN
                }
            }
            _ => ProbeResult::UNKNOWN,
        }
    }
}

/// One way of measuring a media file.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Measure the file. Missing values are `None`.
    async fn measure(&self, path: &Path) -> MediaResult<ProbeReading>;
}

/// Ordered probe fallback chain.
#[derive(Clone)]
pub struct Prober {
    strategies: Vec<Arc<dyn ProbeStrategy>>,
}

impl Default for Prober {
    fn default() -> Self {
        let strategies: Vec<Arc<dyn ProbeStrategy>> = vec![
            Arc::new(FormatMetadataStrategy),
            Arc::new(PacketCountStrategy),
        ];
        Self::new(strategies)
    }
}

impl Prober {
    /// Create a prober that tries `strategies` in order.
    pub fn new(strategies: Vec<Arc<dyn ProbeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Measure a file. Never fails: exhausted strategies yield [`ProbeResult::UNKNOWN`].
    pub async fn probe(&self, path: impl AsRef<Path>) -> ProbeResult {
        let path = path.as_ref();
        let mut reading = ProbeReading::default();

        for strategy in &self.strategies {
            match strategy.measure(path).await {
                Ok(partial) => {
                    debug!(
                        strategy = strategy.name(),
                        frames = ?partial.frames,
                        duration = ?partial.duration,
                        "Probe strategy reading"
                    );
                    reading.merge(partial);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), path = %path.display(), "Probe strategy failed: {}", e);
                }
            }

            if reading.is_complete() {
                break;
            }
        }

        // Without a reported rate, derive with the base rate
        let result = reading.resolve(f64::from(BASE_FPS));
        if !result.is_known() {
            warn!(path = %path.display(), "Probe chain exhausted without a usable measurement");
        }
        result
    }
}

/// Container and stream metadata (`-show_format -show_streams`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatMetadataStrategy;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

impl FfprobeStream {
    /// Average rate, else the container's base rate. WebM reports its
    /// 1 kHz timebase as `r_frame_rate`, so rates above any real camera
    /// are discarded.
    fn fps(&self) -> Option<f64> {
        let plausible = |fps: &f64| *fps <= f64::from(MAX_OUTPUT_FPS);
        self.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .filter(plausible)
            .or_else(|| {
                self.r_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .filter(plausible)
            })
    }
}

#[async_trait]
impl ProbeStrategy for FormatMetadataStrategy {
    fn name(&self) -> &'static str {
        "format_metadata"
    }

    async fn measure(&self, path: &Path) -> MediaResult<ProbeReading> {
        let output = run_ffprobe(
            &["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"],
            path,
        )
        .await?;
        Ok(parse_format_metadata(&serde_json::from_slice(&output)?))
    }
}

fn parse_format_metadata(probe: &FfprobeOutput) -> ProbeReading {
    let video = find_video_stream(probe);

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_positive_f64)
        .or_else(|| video.and_then(|s| s.duration.as_deref()).and_then(parse_positive_f64));

    ProbeReading {
        frames: video.and_then(|s| s.nb_frames.as_deref()).and_then(parse_positive_u64),
        duration,
        fps: video.and_then(FfprobeStream::fps),
    }
}

/// Decode-side packet count of the first video stream (`-count_packets`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketCountStrategy;

#[async_trait]
impl ProbeStrategy for PacketCountStrategy {
    fn name(&self) -> &'static str {
        "packet_count"
    }

    async fn measure(&self, path: &Path) -> MediaResult<ProbeReading> {
        let output = run_ffprobe(
            &[
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-show_entries",
                "stream=codec_type,nb_read_packets,avg_frame_rate,r_frame_rate,duration",
                "-print_format",
                "json",
            ],
            path,
        )
        .await?;
        Ok(parse_packet_count(&serde_json::from_slice(&output)?))
    }
}

fn parse_packet_count(probe: &FfprobeOutput) -> ProbeReading {
    let Some(video) = find_video_stream(probe).or(probe.streams.first()) else {
        return ProbeReading::default();
    };

    let frames = video.nb_read_packets.as_deref().and_then(parse_positive_u64);
    let fps = video.fps();
    let duration = video
        .duration
        .as_deref()
        .and_then(parse_positive_f64)
        .or_else(|| match (frames, fps) {
            (Some(frames), Some(fps)) => Some(frames as f64 / fps),
            _ => None,
        });

    ProbeReading {
        frames,
        duration,
        fps,
    }
}

fn find_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

async fn run_ffprobe(args: &[&str], path: &Path) -> MediaResult<Vec<u8>> {
    if !path.exists() {
        return Err(MediaError::SourceMissing(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    Ok(output.stdout)
}

fn parse_positive_f64(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn parse_positive_u64(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok().filter(|v| *v > 0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    parse_positive_f64(s)
}
