use super::histogram::BUCKETS;
use super::limits::ContrastLimits;
use image::{ImageBuffer, Pixel};
use std::ops::DerefMut;

/// Per-channel remapping table for linear contrast stretching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    entries: [u8; BUCKETS],
}

impl Default for LookupTable {
    fn default() -> Self {
        Self::identity()
    }
}

impl LookupTable {
    /// Table that leaves every value unchanged
    pub fn identity() -> Self {
        let mut entries = [0u8; BUCKETS];
        for (value, entry) in entries.iter_mut().enumerate() {
            *entry = value as u8;
        }
        Self { entries }
    }

    /// Stretch `min..=max` onto `0..=255`, clipping everything outside
    ///
    /// `min` maps to 0 and `max` to 255 exactly. A range with `min >= max`
    /// has no meaningful scale and yields the identity table.
    pub fn stretch(min: u8, max: u8) -> Self {
        if min >= max {
            tracing::debug!(min, max, "degenerate stretch range, using identity table");
            return Self::identity();
        }

        let scale = 255.0 / (max - min) as f64;
        let mut entries = [0u8; BUCKETS];
        for (value, entry) in entries.iter_mut().enumerate() {
            let value = value as u8;
            *entry = if value < min {
                0
            } else if value > max {
                255
            } else {
                ((value - min) as f64 * scale).round_ties_even().min(255.0) as u8
            };
        }
        Self { entries }
    }

    pub fn from_limits(limits: ContrastLimits) -> Self {
        Self::stretch(limits.min, limits.max)
    }

    #[inline]
    pub fn get(&self, value: u8) -> u8 {
        self.entries[value as usize]
    }

    pub fn entries(&self) -> &[u8; BUCKETS] {
        &self.entries
    }

    pub fn is_identity(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(value, &entry)| value == entry as usize)
    }

    /// Remap the colour channels of every pixel in place; alpha is kept
    pub fn apply<P, C>(&self, image: &mut ImageBuffer<P, C>)
    where
        P: Pixel<Subpixel = u8>,
        C: DerefMut<Target = [u8]>,
    {
        for pixel in image.pixels_mut() {
            pixel.apply_without_alpha(|channel| self.entries[channel as usize]);
        }
    }
}
