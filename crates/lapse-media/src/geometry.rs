//! Aspect-ratio geometry: centre crop, fit scale and black padding.

use lapse_models::AspectRatio;
use serde::Serialize;
use std::fmt;

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Spatial transforms for one output aspect ratio.
///
/// `crop` is an FFmpeg crop expression with commas already escaped for use
/// inside a filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeometryProfile {
    pub aspect_ratio: AspectRatio,
    pub crop: Option<String>,
    pub scale: Dimensions,
    pub pad: Dimensions,
}

impl GeometryProfile {
    /// Profile of a supported ratio.
    pub fn for_ratio(ratio: AspectRatio) -> Self {
        let canonical = canonical_size(ratio);
        let crop = match ratio {
            AspectRatio::Landscape => None,
            other => {
                let (w, h) = other.terms();
                Some(centre_crop(w, h))
            }
        };

        Self {
            aspect_ratio: ratio,
            crop,
            scale: canonical,
            pad: canonical,
        }
    }

    /// Filter stages in application order: crop, scale, pad, square pixels.
    pub fn filters(&self) -> Vec<String> {
        let mut filters = Vec::with_capacity(4);
        if let Some(crop) = &self.crop {
            filters.push(crop.clone());
        }
        filters.push(format!(
            "scale={}:{}:force_original_aspect_ratio=decrease",
            self.scale.width, self.scale.height
        ));
        filters.push(format!(
            "pad={}:{}:(ow-iw)/2:(oh-ih)/2:color=black",
            self.pad.width, self.pad.height
        ));
        filters.push("setsar=1".to_string());
        filters
    }
}

impl From<AspectRatio> for GeometryProfile {
    fn from(ratio: AspectRatio) -> Self {
        Self::for_ratio(ratio)
    }
}

/// Resolve an aspect tag. Unsupported tags get the 16:9 profile.
pub fn resolve(tag: &str) -> GeometryProfile {
    GeometryProfile::for_ratio(AspectRatio::from_tag_or_default(tag))
}

fn canonical_size(ratio: AspectRatio) -> Dimensions {
    match ratio {
        AspectRatio::Portrait => Dimensions::new(1080, 1920),
        AspectRatio::Square => Dimensions::new(1080, 1080),
        AspectRatio::FeedPortrait => Dimensions::new(1080, 1350),
        AspectRatio::Landscape => Dimensions::new(1920, 1080),
    }
}

/// Largest centred `w:h` window of the input, rounded down to even sizes.
fn centre_crop(w: u32, h: u32) -> String {
    let width = if w == h {
        "min(iw\\,ih)".to_string()
    } else {
        format!("min(iw\\,ih*{w}/{h})")
    };
    let height = if w == h {
        "min(iw\\,ih)".to_string()
    } else {
        format!("min(ih\\,iw*{h}/{w})")
    };
    format!("crop=trunc({width}/2)*2:trunc({height}/2)*2")
}
