use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Rec. 709 relative luminance weights
const RED_WEIGHT: f64 = 0.2126;
const GREEN_WEIGHT: f64 = 0.7152;
const BLUE_WEIGHT: f64 = 0.0722;

/// Numeric semantics used to turn a pixel into a histogram bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuminanceMode {
    /// Luminance is rounded to a byte as soon as it is computed
    #[default]
    Byte,
    /// Luminance stays a float and is only bucketed when counted
    Real,
}

impl LuminanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Real => "real",
        }
    }

    /// Histogram bucket for a pixel under this mode
    #[inline]
    pub fn bucket(&self, red: u8, green: u8, blue: u8) -> u8 {
        match self {
            Self::Byte => luminance_u8(red, green, blue),
            Self::Real => to_bucket(luminance_f64(red, green, blue)),
        }
    }
}

/// Weighted brightness as a float in [0, 255]
#[inline]
pub fn luminance_f64(red: u8, green: u8, blue: u8) -> f64 {
    RED_WEIGHT * red as f64 + GREEN_WEIGHT * green as f64 + BLUE_WEIGHT * blue as f64
}

/// Weighted brightness rounded half-to-even to a byte
#[inline]
pub fn luminance_u8(red: u8, green: u8, blue: u8) -> u8 {
    to_bucket(luminance_f64(red, green, blue))
}

/// Round half-to-even and clamp into a bucket index
#[inline]
pub fn to_bucket(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}
