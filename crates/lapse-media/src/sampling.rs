//! Sampling policy: fit any number of source frames into a target duration.
//!
//! The policy keeps the output at [`BASE_FPS`] and drops frames at a fixed
//! interval. When that interval would grow past [`MAX_INTERVAL`] the motion
//! becomes visibly choppy, so the output frame rate is raised instead (up to
//! [`MAX_OUTPUT_FPS`]) and the interval recomputed for the new rate.

use serde::Serialize;

/// Playback rate of a normal timelapse and assumed rate of unprobed sources.
pub const BASE_FPS: u32 = 30;
/// Largest frame-drop interval before the output frame rate is raised.
pub const MAX_INTERVAL: u64 = 60;
/// Output frame rate ceiling.
pub const MAX_OUTPUT_FPS: u32 = 240;

/// How a render samples its source frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "case", rename_all = "snake_case")]
pub enum SamplingPlan {
    /// Not enough material for the requested duration: every frame is used
    /// at [`BASE_FPS`] and the output is shorter than requested.
    Insufficient { actual_output_seconds: u32 },
    /// Keep one of every `interval` frames at [`BASE_FPS`].
    Normal { interval: u64 },
    /// Too much material for [`MAX_INTERVAL`]: play back faster.
    Excess { interval: u64, output_fps: u32 },
}

impl SamplingPlan {
    /// Choose the plan for `total_frames` source frames and a target length.
    ///
    /// `total_frames <= 0` is the degenerate insufficient case with one
    /// second of output. A zero target is treated as one second.
    pub fn compute(total_frames: i64, desired_output_seconds: u32) -> Self {
        let desired = u64::from(desired_output_seconds.max(1));
        let needed = u64::from(BASE_FPS) * desired;

        let total = match u64::try_from(total_frames) {
            Ok(total) if total > needed => total,
            _ => {
                let available = total_frames.max(0) as u64;
                let seconds = (available / u64::from(BASE_FPS)).max(1);
                return SamplingPlan::Insufficient {
                    actual_output_seconds: u32::try_from(seconds).unwrap_or(u32::MAX),
                };
            }
        };

        let interval = total / needed;
        if interval <= MAX_INTERVAL {
            return SamplingPlan::Normal { interval };
        }

        let usable = total / MAX_INTERVAL;
        let fps = usable
            .div_ceil(desired)
            .min(u64::from(MAX_OUTPUT_FPS));
        let interval = (total / (fps * desired)).max(1);

        SamplingPlan::Excess {
            interval,
            output_fps: fps as u32,
        }
    }

    /// Keep one of every N source frames.
    pub fn sampling_interval(&self) -> u64 {
        match self {
            SamplingPlan::Insufficient { .. } => 1,
            SamplingPlan::Normal { interval } | SamplingPlan::Excess { interval, .. } => *interval,
        }
    }

    pub fn output_fps(&self) -> u32 {
        match self {
            SamplingPlan::Excess { output_fps, .. } => *output_fps,
            _ => BASE_FPS,
        }
    }

    /// Achievable duration when it replaces the requested one.
    pub fn actual_output_seconds(&self) -> Option<u32> {
        match self {
            SamplingPlan::Insufficient {
                actual_output_seconds,
            } => Some(*actual_output_seconds),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn case_label(&self) -> &'static str {
        match self {
            SamplingPlan::Insufficient { .. } => "A",
            SamplingPlan::Normal { .. } => "B",
            SamplingPlan::Excess { .. } => "C",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATIONS: [u32; 6] = [15, 30, 45, 60, 90, 120];

    #[test]
    fn test_short_recording_is_insufficient() {
        let plan = SamplingPlan::compute(100, 30);
        assert_eq!(plan, SamplingPlan::Insufficient { actual_output_seconds: 3 });
        assert_eq!(plan.sampling_interval(), 1);
        assert_eq!(plan.output_fps(), BASE_FPS);
        assert_eq!(plan.actual_output_seconds(), Some(3));
        assert_eq!(plan.case_label(), "A");
    }

    #[test]
    fn test_interval_at_bound_is_normal() {
        let plan = SamplingPlan::compute(54_000, 30);
        assert_eq!(plan, SamplingPlan::Normal { interval: 60 });
        assert_eq!(plan.output_fps(), 30);
        assert_eq!(plan.actual_output_seconds(), None);
    }

    #[test]
    fn test_long_recording_raises_fps() {
        let plan = SamplingPlan::compute(540_000, 30);
        assert_eq!(
            plan,
            SamplingPlan::Excess {
                interval: 75,
                output_fps: 240
            }
        );
        assert_eq!(plan.case_label(), "C");
    }

    #[test]
    fn test_degenerate_inputs() {
        for total in [0, -1, -90_000, 29] {
            assert_eq!(
                SamplingPlan::compute(total, 60),
                SamplingPlan::Insufficient { actual_output_seconds: 1 }
            );
        }
        // Zero target behaves like one second
        assert_eq!(SamplingPlan::compute(300, 0), SamplingPlan::compute(300, 1));
    }

    #[test]
    fn test_insufficient_range() {
        for desired in DURATIONS {
            let needed = i64::from(BASE_FPS * desired);
            for total in [1, 30, 31, needed / 2, needed - 1, needed] {
                let plan = SamplingPlan::compute(total, desired);
                assert_eq!(plan.sampling_interval(), 1);
                assert_eq!(plan.output_fps(), BASE_FPS);
                let expected = (total / i64::from(BASE_FPS)).max(1) as u32;
                assert_eq!(plan.actual_output_seconds(), Some(expected));
            }
        }
    }

    #[test]
    fn test_normal_range_uses_exact_interval() {
        for desired in DURATIONS {
            let needed = u64::from(BASE_FPS * desired);
            for interval in [1, 2, 17, 59, 60] {
                for extra in [0, 1, needed - 1] {
                    let total = interval * needed + extra;
                    // needed + 0 is still insufficient
                    if total <= needed {
                        continue;
                    }
                    let plan = SamplingPlan::compute(total as i64, desired);
                    assert_eq!(plan, SamplingPlan::Normal { interval });
                }
            }
        }
    }

    #[test]
    fn test_excess_range_lands_near_target() {
        for desired in DURATIONS {
            let needed = u64::from(BASE_FPS * desired);
            for total in [61 * needed, 100 * needed + 7, 600 * needed, 5_000 * needed + 13] {
                let plan = SamplingPlan::compute(total as i64, desired);
                let fps = u64::from(plan.output_fps());
                let interval = plan.sampling_interval();
                let desired = u64::from(desired);

                assert!(matches!(plan, SamplingPlan::Excess { .. }));
                assert!(fps <= u64::from(MAX_OUTPUT_FPS));
                assert!(fps > u64::from(BASE_FPS));
                assert!(interval >= 1);

                let covered = interval * fps * desired;
                assert!(covered <= total);
                assert!(total - covered < fps * desired);
            }
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        for total in [0, 450, 27_000, 1_000_000] {
            assert_eq!(SamplingPlan::compute(total, 45), SamplingPlan::compute(total, 45));
        }
    }
}
