//! Declarative FFmpeg video filter pipeline for timelapse renders.

use crate::geometry::GeometryProfile;
use crate::sampling::SamplingPlan;

/// One stage of the `-vf` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStage {
    /// Keep one of every `interval` frames.
    Subsample { interval: u64 },
    /// Crop, scale, pad and square-pixel stages of an aspect ratio.
    Geometry(GeometryProfile),
    /// Re-time the kept frames to a constant output rate.
    Retime { fps: u32 },
    /// Elapsed playback time in the top-left corner.
    ElapsedOverlay { font_size: u32 },
}

impl FilterStage {
    fn render(&self) -> Vec<String> {
        match self {
            FilterStage::Subsample { interval } => {
                vec![format!("select=not(mod(n\\,{interval}))")]
            }
            FilterStage::Geometry(profile) => profile.filters(),
            FilterStage::Retime { fps } => vec![format!("setpts=N/({fps}*TB)")],
            FilterStage::ElapsedOverlay { font_size } => vec![format!(
                "drawtext=text='%{{pts\\:hms}}':fontsize={font_size}:fontcolor=white:\
                 x=10:y=10:box=1:boxcolor=black@0.5:boxborderw=5"
            )],
        }
    }
}

/// Ordered filter stages joined into one `-vf` argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterPipeline {
    stages: Vec<FilterStage>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage(mut self, stage: FilterStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Video timelapse: subsample (when dropping frames), geometry,
    /// re-time to the plan's frame rate, overlay.
    pub fn for_video(plan: &SamplingPlan, geometry: GeometryProfile, font_size: u32) -> Self {
        let mut pipeline = Self::new();
        let interval = plan.sampling_interval();
        if interval > 1 {
            pipeline = pipeline.stage(FilterStage::Subsample { interval });
        }
        pipeline
            .stage(FilterStage::Geometry(geometry))
            .stage(FilterStage::Retime {
                fps: plan.output_fps(),
            })
            .stage(FilterStage::ElapsedOverlay { font_size })
    }

    /// Photo sequence: frame timing comes from the concat list, so only
    /// geometry and the overlay apply.
    pub fn for_photos(geometry: GeometryProfile, font_size: u32) -> Self {
        Self::new()
            .stage(FilterStage::Geometry(geometry))
            .stage(FilterStage::ElapsedOverlay { font_size })
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// The comma-joined filter graph.
    pub fn to_filter_string(&self) -> String {
        self.stages
            .iter()
            .flat_map(FilterStage::render)
            .collect::<Vec<_>>()
            .join(",")
    }
}
