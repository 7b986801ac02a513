use super::luminance::LuminanceMode;
use image::{ImageBuffer, Pixel};
use serde::{Serialize, Serializer};
use std::ops::{Deref, Index};

/// Number of luminance buckets for 8-bit channels
pub const BUCKETS: usize = 256;

/// Pixel counts per luminance bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; BUCKETS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            counts: [0; BUCKETS],
        }
    }
}

impl Histogram {
    /// Wrap precomputed counts
    pub fn from_counts(counts: [u64; BUCKETS]) -> Self {
        Self { counts }
    }

    /// Count every pixel of an 8-bit image by luminance bucket
    ///
    /// Gray pixels count as R=G=B and alpha is ignored. The scan is a single
    /// row-major pass; an empty image yields an all-zero histogram.
    pub fn from_image<P, C>(image: &ImageBuffer<P, C>, mode: LuminanceMode) -> Self
    where
        P: Pixel<Subpixel = u8>,
        C: Deref<Target = [u8]>,
    {
        let mut histogram = Self::default();
        for pixel in image.pixels() {
            let [red, green, blue] = pixel.to_rgb().0;
            histogram.counts[mode.bucket(red, green, blue) as usize] += 1;
        }
        histogram
    }

    pub fn count(&self, bucket: u8) -> u64 {
        self.counts[bucket as usize]
    }

    pub fn counts(&self) -> &[u64; BUCKETS] {
        &self.counts
    }

    /// Sum of all buckets
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Largest single bucket count
    pub fn peak(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

impl Index<u8> for Histogram {
    type Output = u64;

    fn index(&self, bucket: u8) -> &u64 {
        &self.counts[bucket as usize]
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.counts.iter())
    }
}
