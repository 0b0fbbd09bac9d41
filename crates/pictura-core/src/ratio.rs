use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when parsing ratio or size strings at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported aspect ratio: {0}")]
    Ratio(String),
    #[error("unsupported image size: {0} (expected 1K, 2K or 4K)")]
    Size(String),
    #[error("unknown preset: {0}")]
    Preset(String),
}

/// The closed set of aspect ratios every provider is addressed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl SupportedRatio {
    /// Every supported ratio, in canonical order
    pub const ALL: [Self; 10] = [
        Self::Square,
        Self::Portrait2x3,
        Self::Landscape3x2,
        Self::Portrait3x4,
        Self::Landscape4x3,
        Self::Portrait4x5,
        Self::Landscape5x4,
        Self::Portrait9x16,
        Self::Landscape16x9,
        Self::Ultrawide21x9,
    ];

    /// The ratio in `W:H` notation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait2x3 => "2:3",
            Self::Landscape3x2 => "3:2",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait4x5 => "4:5",
            Self::Landscape5x4 => "5:4",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
            Self::Ultrawide21x9 => "21:9",
        }
    }

    /// Base pixel dimensions at the 2K tier
    pub const fn base_dimensions(self) -> Dimensions {
        let (width, height) = match self {
            Self::Square => (2048, 2048),
            Self::Portrait2x3 => (1365, 2048),
            Self::Landscape3x2 => (2048, 1365),
            Self::Portrait3x4 => (1536, 2048),
            Self::Landscape4x3 => (2048, 1536),
            Self::Portrait4x5 => (1638, 2048),
            Self::Landscape5x4 => (2048, 1638),
            Self::Portrait9x16 => (1152, 2048),
            Self::Landscape16x9 => (2048, 1152),
            Self::Ultrawide21x9 => (2048, 878),
        };
        Dimensions { width, height }
    }

    /// Supported ratio whose shape is closest to the given pixel size
    ///
    /// Returns `None` when either side is zero.
    pub fn closest_to(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let target = f64::from(width) / f64::from(height);

        Self::ALL.into_iter().min_by(|a, b| {
            let da = (a.aspect() - target).abs();
            let db = (b.aspect() - target).abs();
            da.total_cmp(&db)
        })
    }

    fn aspect(self) -> f64 {
        let base = self.base_dimensions();
        f64::from(base.width) / f64::from(base.height)
    }
}

impl fmt::Display for SupportedRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedRatio {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| ParseError::Ratio(s.to_owned()))
    }
}

/// Resolution tier applied on top of the per-ratio base dimensions
///
/// Ordered from smallest to largest so capability checks can compare tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }

    /// Multiplier as a (numerator, denominator) pair: 0.5, 1 and 2
    const fn multiplier(self) -> (u32, u32) {
        match self {
            Self::OneK => (1, 2),
            Self::TwoK => (1, 1),
            Self::FourK => (2, 1),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            _ => Err(ParseError::Size(s.to_owned())),
        }
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Canonical pixel dimensions for a ratio at a size tier
///
/// Base table value times the tier multiplier, rounded half up.
pub const fn dimensions_for_ratio(ratio: SupportedRatio, size: ImageSize) -> Dimensions {
    let base = ratio.base_dimensions();
    let (num, den) = size.multiplier();

    Dimensions {
        width: scale_rounded(base.width, num, den),
        height: scale_rounded(base.height, num, den),
    }
}

const fn scale_rounded(value: u32, num: u32, den: u32) -> u32 {
    (value * num * 2 + den) / (den * 2)
}
