//! Batch analysis: histograms and suggested limits for a set of images

use crate::codec;
use crate::config::Config;
use crate::error::AdjustError;
use crate::stretch::{ContrastLimits, CutoffPair, Histogram};
use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Limits computed for one cutoff pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LimitsAtCutoff {
    pub cutoff: CutoffPair,
    pub limits: ContrastLimits,
}

/// Everything learned about a single image
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub histogram: Histogram,
    pub limits: Vec<LimitsAtCutoff>,
}

impl AnalysisRecord {
    pub fn from_image(path: &Path, image: &DynamicImage, config: &Config) -> Result<Self, AdjustError> {
        let histogram = codec::histogram_of(image, config.luminance)?;
        let total = image.width() as u64 * image.height() as u64;
        let limits = config
            .cutoffs
            .iter()
            .map(|&cutoff| LimitsAtCutoff {
                cutoff,
                limits: ContrastLimits::solve(&histogram, total, cutoff),
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            histogram,
            limits,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether this image's limits for cutoff `index` are more extreme than
    /// `average`, as `(min below average, max above average)`
    pub fn flags(&self, index: usize, average: ContrastLimits) -> (bool, bool) {
        match self.limits.get(index) {
            Some(entry) => (entry.limits.min < average.min, entry.limits.max > average.max),
            None => (false, false),
        }
    }
}

/// Result of analyzing a batch
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub cutoffs: Vec<CutoffPair>,
    pub records: Vec<AnalysisRecord>,
    /// Per cutoff pair, MinValue and MaxValue averaged over all records
    pub averages: Vec<ContrastLimits>,
}

impl Analysis {
    pub fn new(cutoffs: Vec<CutoffPair>, records: Vec<AnalysisRecord>) -> Self {
        let averages = (0..cutoffs.len())
            .map(|index| average_limits(&records, index))
            .collect();
        Self {
            cutoffs,
            records,
            averages,
        }
    }

    /// Number of per-image values above or below the averages
    pub fn flagged_count(&self) -> usize {
        self.records
            .iter()
            .map(|record| {
                self.averages
                    .iter()
                    .enumerate()
                    .map(|(index, &average)| {
                        let (low, high) = record.flags(index, average);
                        low as usize + high as usize
                    })
                    .sum::<usize>()
            })
            .sum()
    }
}

pub fn analyze_file(path: &Path, config: &Config) -> Result<AnalysisRecord, AdjustError> {
    let image = codec::load(path)?;
    AnalysisRecord::from_image(path, &image, config)
}

/// Identify every input, then analyze them in case-insensitive path order
///
/// The first file that is not a readable image aborts the batch.
pub fn analyze_batch(paths: &[PathBuf], config: &Config) -> Result<Analysis, AdjustError> {
    if paths.is_empty() {
        return Err(AdjustError::InvalidRequest("no images given".to_string()));
    }

    for path in paths {
        codec::identify(path)?;
    }

    let ordered = sorted_ignore_case(paths);
    let mut records = Vec::with_capacity(ordered.len());

    for (index, path) in ordered.iter().enumerate() {
        tracing::info!("Analyzing image {} of {}: {}", index + 1, ordered.len(), path.display());
        let start = Instant::now();
        let record = analyze_file(path, config)?;

        for entry in &record.limits {
            tracing::debug!(
                "{} at {}: {}",
                record.file_name(),
                entry.cutoff,
                entry.limits
            );
        }
        tracing::debug!("Analyzed {} in {}ms", record.file_name(), start.elapsed().as_millis());

        records.push(record);
    }

    Ok(Analysis::new(config.cutoffs.clone(), records))
}

/// Order paths by their upper-cased text, so `_` sorts after letters
pub fn sorted_ignore_case(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut ordered = paths.to_vec();
    ordered.sort_by_cached_key(|path| path.to_string_lossy().to_uppercase());
    ordered
}

/// Mean of MinValue and MaxValue at cutoff `index`, rounded half-to-even
fn average_limits(records: &[AnalysisRecord], index: usize) -> ContrastLimits {
    let values: Vec<ContrastLimits> = records
        .iter()
        .filter_map(|record| record.limits.get(index).map(|entry| entry.limits))
        .collect();

    if values.is_empty() {
        return ContrastLimits::FULL;
    }

    let count = values.len() as f64;
    let mean = |sum: f64| (sum / count).round_ties_even().clamp(0.0, 255.0) as u8;

    ContrastLimits {
        min: mean(values.iter().map(|limits| limits.min as f64).sum()),
        max: mean(values.iter().map(|limits| limits.max as f64).sum()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stretch::{LuminanceMode, BUCKETS};
    use image::{Rgb, RgbImage};

    fn record(name: &str, limits: &[(u8, u8)]) -> AnalysisRecord {
        AnalysisRecord {
            path: PathBuf::from(format!("/photos/{}", name)),
            width: 10,
            height: 10,
            histogram: Histogram::from_counts([0; BUCKETS]),
            limits: limits
                .iter()
                .map(|&(min, max)| LimitsAtCutoff {
                    cutoff: CutoffPair::symmetric(0.0),
                    limits: ContrastLimits { min, max },
                })
                .collect(),
        }
    }

    #[test]
    fn test_averages_round_half_to_even() {
        let records = vec![record("a.png", &[(10, 200)]), record("b.png", &[(11, 203)])];
        let analysis = Analysis::new(vec![CutoffPair::symmetric(0.0)], records);
        // 10.5 -> 10, 201.5 -> 202
        assert_eq!(analysis.averages, vec![ContrastLimits { min: 10, max: 202 }]);
    }

    #[test]
    fn test_flags_mark_images_beyond_average() {
        let records = vec![record("a.png", &[(4, 250)]), record("b.png", &[(20, 230)])];
        let analysis = Analysis::new(vec![CutoffPair::symmetric(0.0)], records);
        let average = analysis.averages[0];
        assert_eq!(average, ContrastLimits { min: 12, max: 240 });
        assert_eq!(analysis.records[0].flags(0, average), (true, true));
        assert_eq!(analysis.records[1].flags(0, average), (false, false));
        assert_eq!(analysis.flagged_count(), 2);
    }

    #[test]
    fn test_sorting_ignores_case() {
        let paths = vec![
            PathBuf::from("b.png"),
            PathBuf::from("A.png"),
            PathBuf::from("c.png"),
        ];
        let ordered = sorted_ignore_case(&paths);
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("A.png"),
                PathBuf::from("b.png"),
                PathBuf::from("c.png")
            ]
        );
    }

    #[test]
    fn test_sorting_compares_upper_case() {
        let paths = vec![
            PathBuf::from("_x.png"),
            PathBuf::from("b.png"),
            PathBuf::from("A.png"),
        ];
        let ordered = sorted_ignore_case(&paths);
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("A.png"),
                PathBuf::from("b.png"),
                PathBuf::from("_x.png")
            ]
        );
    }

    #[test]
    fn test_record_from_image_uses_every_cutoff() {
        // left half black, right half white
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let config = Config {
            luminance: LuminanceMode::Byte,
            ..Config::default()
        };
        let record =
            AnalysisRecord::from_image(Path::new("half.png"), &DynamicImage::ImageRgb8(img), &config)
                .unwrap();
        assert_eq!(record.histogram.count(0), 50);
        assert_eq!(record.histogram.count(255), 50);
        assert_eq!(record.limits.len(), 2);
        assert!(record.limits.iter().all(|entry| entry.limits.is_full()));
        assert_eq!(record.total_pixels(), record.histogram.total());
    }

    #[test]
    fn test_batch_rejects_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbImage::new(2, 2).save(&good).unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"nope").unwrap();

        let err = analyze_batch(&[good, bad.clone()], &Config::default()).unwrap_err();
        match err {
            AdjustError::InvalidImage { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(analyze_batch(&[], &Config::default()).is_err());
    }
}
