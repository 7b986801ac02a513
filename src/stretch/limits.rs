use super::histogram::Histogram;
use crate::error::AdjustError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Share of pixels clipped from one end of the luminance range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Cutoff {
    /// Keep this end of the range at 0 or 255
    #[default]
    Disabled,
    /// Percentage of the total pixel count, typically 0-100
    Percent(f64),
}

impl Cutoff {
    /// Map the legacy "negative means off" convention onto the tri-state
    pub fn from_sentinel(value: f64) -> Self {
        if value < 0.0 || value.is_nan() {
            Self::Disabled
        } else {
            Self::Percent(value)
        }
    }

    /// Active percentage, if any
    pub fn percentage(&self) -> Option<f64> {
        match *self {
            Self::Percent(p) if p >= 0.0 => Some(p),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Cutoff {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Disabled, Self::from_sentinel)
    }
}

impl From<Cutoff> for Option<f64> {
    fn from(cutoff: Cutoff) -> Self {
        cutoff.percentage()
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage() {
            Some(p) => write!(f, "{}%", p),
            None => f.write_str("off"),
        }
    }
}

impl FromStr for Cutoff {
    type Err = AdjustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("off") || s.eq_ignore_ascii_case("none") {
            return Ok(Self::Disabled);
        }
        let value: f64 = s
            .trim_end_matches('%')
            .parse()
            .map_err(|_| AdjustError::InvalidCutoff(format!("'{}' is not a number", s)))?;
        if value.is_nan() || value.is_infinite() {
            return Err(AdjustError::InvalidCutoff(format!(
                "'{}' is not a finite number",
                s
            )));
        }
        Ok(Self::from_sentinel(value))
    }
}

/// Lower and upper cutoff used together for one set of limits
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CutoffPair {
    pub lower: Cutoff,
    pub upper: Cutoff,
}

impl CutoffPair {
    pub fn new(lower: Cutoff, upper: Cutoff) -> Self {
        Self { lower, upper }
    }

    pub fn symmetric(percent: f64) -> Self {
        let cutoff = Cutoff::from_sentinel(percent);
        Self::new(cutoff, cutoff)
    }

    /// Column label used in reports
    pub fn label(&self) -> String {
        if self.lower == self.upper {
            self.lower.to_string()
        } else {
            format!("{} / {}", self.lower, self.upper)
        }
    }
}

impl fmt::Display for CutoffPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lower, self.upper)
    }
}

/// Parses `P` (same cutoff on both ends) or `L:U`
impl FromStr for CutoffPair {
    type Err = AdjustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((lower, upper)) => Ok(Self::new(lower.parse()?, upper.parse()?)),
            None => {
                let cutoff: Cutoff = s.parse()?;
                Ok(Self::new(cutoff, cutoff))
            }
        }
    }
}

/// Inclusive luminance range to preserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContrastLimits {
    pub min: u8,
    pub max: u8,
}

impl Default for ContrastLimits {
    fn default() -> Self {
        Self::FULL
    }
}

impl ContrastLimits {
    /// The whole 8-bit range, which stretches nothing
    pub const FULL: Self = Self { min: 0, max: 255 };

    /// Validate user-chosen limits
    pub fn try_new(min: u8, max: u8) -> Result<Self, AdjustError> {
        if min >= max {
            return Err(AdjustError::InvalidLimits { min, max });
        }
        Ok(Self { min, max })
    }

    /// Derive limits that clip the requested share of pixels on each end
    ///
    /// `total` is the pixel count the cutoffs are relative to and is
    /// expected to equal `histogram.total()`. An empty or inverted result
    /// falls back to [`ContrastLimits::FULL`].
    pub fn solve(histogram: &Histogram, total: u64, cutoffs: CutoffPair) -> Self {
        let (min, max) = raw_bounds(histogram, total, cutoffs);
        normalize_or_full_range(min, max)
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

impl fmt::Display for ContrastLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Pixel count a percentage of `total` stands for, rounded half-to-even
pub fn cutoff_count(total: u64, percentage: f64) -> u64 {
    (total as f64 * percentage / 100.0).round_ties_even() as u64
}

/// Bounds from the histogram scans, before the inversion check
///
/// Each side starts at its extreme (0 or 255) and moves to the first bucket
/// whose running count exceeds the cutoff count. A disabled side, or a
/// cutoff no bucket exceeds, keeps the extreme.
pub fn raw_bounds(histogram: &Histogram, total: u64, cutoffs: CutoffPair) -> (u8, u8) {
    let min = cutoffs
        .lower
        .percentage()
        .and_then(|p| first_exceeding(histogram, 0..=255u8, cutoff_count(total, p)))
        .unwrap_or(0);
    let max = cutoffs
        .upper
        .percentage()
        .and_then(|p| first_exceeding(histogram, (0..=255u8).rev(), cutoff_count(total, p)))
        .unwrap_or(255);
    (min, max)
}

/// Pass valid bounds through; replace empty or inverted ones with the full range
pub fn normalize_or_full_range(min: u8, max: u8) -> ContrastLimits {
    if min >= max {
        tracing::debug!(min, max, "limits collapsed, falling back to full range");
        ContrastLimits::FULL
    } else {
        ContrastLimits { min, max }
    }
}

fn first_exceeding<I>(histogram: &Histogram, buckets: I, limit: u64) -> Option<u8>
where
    I: Iterator<Item = u8>,
{
    let mut running = 0u64;
    for bucket in buckets {
        running += histogram.count(bucket);
        if running > limit {
            return Some(bucket);
        }
    }
    None
}
