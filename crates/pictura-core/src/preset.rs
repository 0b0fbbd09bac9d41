use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ratio::{ParseError, SupportedRatio};

/// Named bundles of ratios for common publishing targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Social,
    Web,
    Portrait,
    Landscape,
    Print,
}

impl Preset {
    pub const ALL: [Self; 5] = [Self::Social, Self::Web, Self::Portrait, Self::Landscape, Self::Print];

    /// Ratios in the bundle, in generation order
    pub const fn ratios(self) -> &'static [SupportedRatio] {
        use SupportedRatio::{
            Landscape3x2, Landscape4x3, Landscape16x9, Portrait2x3, Portrait3x4, Portrait4x5, Portrait9x16,
            Square, Ultrawide21x9,
        };

        match self {
            Self::Social => &[Square, Portrait9x16, Landscape16x9],
            Self::Web => &[Landscape16x9, Landscape4x3, Square],
            Self::Portrait => &[Portrait2x3, Portrait3x4, Portrait4x5, Portrait9x16],
            Self::Landscape => &[Landscape3x2, Landscape4x3, Landscape16x9, Ultrawide21x9],
            Self::Print => &[Portrait2x3, Portrait3x4, Portrait4x5],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Web => "web",
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
            Self::Print => "print",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::Preset(s.to_owned()))
    }
}
