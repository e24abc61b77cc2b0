//! Output aspect ratio definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Aspect ratios a timelapse can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum AspectRatio {
    /// 9:16 portrait for Reels/Shorts
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1 square
    #[serde(rename = "1:1")]
    Square,
    /// 4:5 feed portrait
    #[serde(rename = "4:5")]
    FeedPortrait,
    /// 16:9 landscape
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// Every supported ratio.
    pub const ALL: &'static [AspectRatio] = &[
        AspectRatio::Portrait,
        AspectRatio::Square,
        AspectRatio::FeedPortrait,
        AspectRatio::Landscape,
    ];

    /// The `W:H` tag used on the wire.
    pub fn as_tag(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::FeedPortrait => "4:5",
            AspectRatio::Landscape => "16:9",
        }
    }

    /// Width and height terms of the ratio.
    pub fn terms(&self) -> (u32, u32) {
        match self {
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Square => (1, 1),
            AspectRatio::FeedPortrait => (4, 5),
            AspectRatio::Landscape => (16, 9),
        }
    }

    /// Lenient lookup: unknown tags fall back to the default ratio.
    pub fn from_tag_or_default(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for AspectRatio {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.as_tag() == s.trim())
            .ok_or_else(|| ModelError::InvalidAspectRatio(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_tags() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert_eq!("1:1".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        assert_eq!("4:5".parse::<AspectRatio>().unwrap(), AspectRatio::FeedPortrait);
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
    }

    #[test]
    fn test_reject_unsupported_tag() {
        let err = "21:9".parse::<AspectRatio>().unwrap_err();
        assert_eq!(err, ModelError::InvalidAspectRatio("21:9".to_string()));
    }

    #[test]
    fn test_lenient_lookup_defaults_to_landscape() {
        assert_eq!(AspectRatio::from_tag_or_default("21:9"), AspectRatio::Landscape);
        assert_eq!(AspectRatio::from_tag_or_default("1:1"), AspectRatio::Square);
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&AspectRatio::FeedPortrait).unwrap();
        assert_eq!(json, "\"4:5\"");
        let parsed: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(parsed, AspectRatio::Portrait);
        assert!(serde_json::from_str::<AspectRatio>("\"21:9\"").is_err());
    }
}
