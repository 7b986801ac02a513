//! Analysis report rendering
//!
//! The HTML report lists the suggested limits per image next to the batch
//! averages. Values that would be clipped harder than the average suggests
//! are highlighted.

use crate::analysis::Analysis;
use crate::config::Config;
use crate::error::AdjustError;
use crate::stretch::{ContrastLimits, Histogram, BUCKETS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const CHART_HEIGHT: u32 = 100;
const CHART_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const CHART_BAR: Rgb<u8> = Rgb([96, 96, 96]);
const CHART_LIMIT: Rgb<u8> = Rgb([220, 30, 30]);

const STYLE: &[&str] = &[
    "body { margin: 0; }",
    "table { margin: 20px; border-collapse: collapse; }",
    "table, th, td { border: 1px solid gray; }",
    "th, td { padding: 10px; }",
    ".warning { background-color: yellow; }",
];

/// Compact UTC timestamp used in generated file names, e.g. `20240131T235959Z`
pub fn utc_stamp() -> String {
    stamp_from(SystemTime::now())
}

pub fn stamp_from(time: SystemTime) -> String {
    humantime::format_rfc3339_seconds(time)
        .to_string()
        .chars()
        .filter(|c| *c != '-' && *c != ':')
        .collect()
}

/// Write the HTML report (and optional histogram charts) into the output
/// folder next to `anchor`, returning the report path
pub fn write_report(
    analysis: &Analysis,
    config: &Config,
    anchor: &Path,
    charts: bool,
) -> Result<PathBuf, AdjustError> {
    let dir = config.output_dir_for(anchor);
    fs::create_dir_all(&dir).map_err(|e| AdjustError::io(&dir, e))?;

    let chart_links = if charts {
        Some(write_charts(analysis, &dir)?)
    } else {
        None
    };

    let path = dir.join(format!("Analyzed-{}.htm", utc_stamp()));
    let html = render_html(analysis, chart_links.as_deref());
    fs::write(&path, html).map_err(|e| AdjustError::io(&path, e))?;

    Ok(path)
}

fn write_charts(analysis: &Analysis, dir: &Path) -> Result<Vec<String>, AdjustError> {
    let chart_dir = dir.join("histograms");
    fs::create_dir_all(&chart_dir).map_err(|e| AdjustError::io(&chart_dir, e))?;

    let mut links = Vec::with_capacity(analysis.records.len());
    for (row, record) in analysis.records.iter().enumerate() {
        let limits = record.limits.first().map(|entry| entry.limits);
        let chart = render_histogram_chart(&record.histogram, limits);
        // row number keeps same-named inputs from different folders apart
        let name = format!("{}-{}.png", row + 1, record.file_name());
        let path = chart_dir.join(&name);
        chart.save(&path).map_err(|e| {
            AdjustError::ProcessingError(format!("Failed to save chart {}: {}", path.display(), e))
        })?;
        links.push(format!("histograms/{}", name));
    }
    Ok(links)
}

/// Bar chart of a histogram, one column per bucket, with the limits marked
pub fn render_histogram_chart(histogram: &Histogram, limits: Option<ContrastLimits>) -> RgbImage {
    let mut chart = RgbImage::from_pixel(BUCKETS as u32, CHART_HEIGHT, CHART_BACKGROUND);
    let peak = histogram.peak();

    if peak > 0 {
        for (bucket, &count) in histogram.counts().iter().enumerate() {
            if count == 0 {
                continue;
            }
            let height = (count * CHART_HEIGHT as u64).div_ceil(peak) as u32;
            let top = (CHART_HEIGHT - height) as i32;
            draw_filled_rect_mut(
                &mut chart,
                Rect::at(bucket as i32, top).of_size(1, height),
                CHART_BAR,
            );
        }
    }

    if let Some(limits) = limits.filter(|limits| !limits.is_full()) {
        let bottom = (CHART_HEIGHT - 1) as f32;
        for x in [limits.min as f32, limits.max as f32] {
            draw_line_segment_mut(&mut chart, (x, 0.0), (x, bottom), CHART_LIMIT);
        }
    }

    chart
}

/// Render the report document
///
/// `charts`, when given, holds one image link per record in order.
pub fn render_html(analysis: &Analysis, charts: Option<&[String]>) -> String {
    let mut html = HtmlWriter::default();

    html.open("html", &[]);
    html.open("head", &[]);
    html.element("title", "Image Analysis Report", &[]);
    html.open("style", &[]);
    for rule in STYLE {
        html.line(rule);
    }
    html.close("style");
    html.close("head");

    html.open("body", &[]);
    html.open("table", &[]);

    html.open("tr", &[]);
    html.element("th", "Average/Image", &[("rowspan", "2")]);
    for cutoff in &analysis.cutoffs {
        html.element("th", &cutoff.label(), &[("colspan", "2")]);
    }
    if charts.is_some() {
        html.element("th", "Histogram", &[("rowspan", "2")]);
    }
    html.close("tr");

    html.open("tr", &[]);
    for _ in &analysis.cutoffs {
        html.element("th", "Min", &[]);
        html.element("th", "Max", &[]);
    }
    html.close("tr");

    html.open("tr", &[]);
    html.element("td", "Average", &[]);
    for average in &analysis.averages {
        html.element("td", &average.min.to_string(), &[]);
        html.element("td", &average.max.to_string(), &[]);
    }
    if charts.is_some() {
        html.element("td", "", &[]);
    }
    html.close("tr");

    for (row, record) in analysis.records.iter().enumerate() {
        html.open("tr", &[]);
        html.element("td", &record.file_name(), &[]);
        for (index, entry) in record.limits.iter().enumerate() {
            let average = analysis
                .averages
                .get(index)
                .copied()
                .unwrap_or(ContrastLimits::FULL);
            let (low, high) = record.flags(index, average);
            html.element("td", &entry.limits.min.to_string(), warning(low));
            html.element("td", &entry.limits.max.to_string(), warning(high));
        }
        if let Some(link) = charts.and_then(|links| links.get(row)) {
            let alt = record.file_name();
            html.open("td", &[]);
            html.void("img", &[("src", link.as_str()), ("alt", alt.as_str())]);
            html.close("td");
        }
        html.close("tr");
    }

    html.close("table");
    html.close("body");
    html.close("html");

    html.finish()
}

fn warning(flagged: bool) -> &'static [(&'static str, &'static str)] {
    if flagged {
        &[("class", "warning")]
    } else {
        &[]
    }
}

/// Indenting element writer
#[derive(Default)]
struct HtmlWriter {
    out: String,
    depth: usize,
}

impl HtmlWriter {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
    }

    fn attributes(&mut self, attributes: &[(&str, &str)]) {
        for (name, value) in attributes {
            let _ = write!(self.out, " {}=\"{}\"", name, escape(value));
        }
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.indent();
        let _ = write!(self.out, "<{}", name);
        self.attributes(attributes);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn void(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.indent();
        let _ = write!(self.out, "<{}", name);
        self.attributes(attributes);
        self.out.push_str(">\n");
    }

    fn element(&mut self, name: &str, text: &str, attributes: &[(&str, &str)]) {
        self.indent();
        let _ = write!(self.out, "<{}", name);
        self.attributes(attributes);
        let _ = writeln!(self.out, ">{}</{}>", escape(text), name);
    }

    fn line(&mut self, text: &str) {
        self.indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.out, "</{}>", name);
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisRecord, LimitsAtCutoff};
    use crate::stretch::CutoffPair;
    use std::time::{Duration, UNIX_EPOCH};

    fn analysis() -> Analysis {
        let cutoffs = vec![CutoffPair::symmetric(0.0), CutoffPair::symmetric(1.0)];
        let record = |name: &str, a: (u8, u8), b: (u8, u8)| AnalysisRecord {
            path: PathBuf::from(name),
            width: 1,
            height: 1,
            histogram: Histogram::default(),
            limits: vec![
                LimitsAtCutoff {
                    cutoff: cutoffs[0],
                    limits: ContrastLimits { min: a.0, max: a.1 },
                },
                LimitsAtCutoff {
                    cutoff: cutoffs[1],
                    limits: ContrastLimits { min: b.0, max: b.1 },
                },
            ],
        };
        let records = vec![
            record("dark<1>.png", (2, 240), (8, 230)),
            record("light.png", (20, 250), (24, 246)),
        ];
        Analysis::new(cutoffs, records)
    }

    #[test]
    fn test_stamp_is_compact_utc() {
        let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(stamp_from(time), "20231114T221320Z");
    }

    #[test]
    fn test_html_lists_averages_and_files() {
        let html = render_html(&analysis(), None);
        assert!(html.contains("<title>Image Analysis Report</title>"));
        assert!(html.contains("<th colspan=\"2\">0%</th>"));
        assert!(html.contains("<th colspan=\"2\">1%</th>"));
        assert!(html.contains("<td>Average</td>"));
        assert!(html.contains("<td>11</td>"));
        assert!(html.contains("<td>245</td>"));
        assert!(html.contains("<td>light.png</td>"));
        assert!(html.contains("dark&lt;1&gt;.png"));
        assert!(!html.contains("Histogram"));
    }

    #[test]
    fn test_html_flags_heavier_adjustments() {
        let html = render_html(&analysis(), None);
        // dark image min 2 < average 11
        assert!(html.contains("<td class=\"warning\">2</td>"));
        // light image max 250 > average 245
        assert!(html.contains("<td class=\"warning\">250</td>"));
        assert!(html.contains("<td>20</td>"));
    }

    #[test]
    fn test_html_links_charts() {
        let links = vec!["histograms/a.png".to_string(), "histograms/b.png".to_string()];
        let html = render_html(&analysis(), Some(&links));
        assert!(html.contains("<th rowspan=\"2\">Histogram</th>"));
        assert!(html.contains("src=\"histograms/b.png\""));
    }

    #[test]
    fn test_chart_draws_bars_and_limits() {
        let mut counts = [0u64; BUCKETS];
        counts[10] = 40;
        counts[100] = 20;
        let chart = render_histogram_chart(
            &Histogram::from_counts(counts),
            Some(ContrastLimits { min: 50, max: 200 }),
        );
        assert_eq!(chart.dimensions(), (256, CHART_HEIGHT));
        // tallest bar reaches the top
        assert_eq!(*chart.get_pixel(10, 0), CHART_BAR);
        // half-height bar
        assert_eq!(*chart.get_pixel(100, CHART_HEIGHT - 1), CHART_BAR);
        assert_eq!(*chart.get_pixel(100, 10), CHART_BACKGROUND);
        assert_eq!(*chart.get_pixel(50, 5), CHART_LIMIT);
        assert_eq!(*chart.get_pixel(200, 5), CHART_LIMIT);
        assert_eq!(*chart.get_pixel(30, 50), CHART_BACKGROUND);
    }

    #[test]
    fn test_chart_of_empty_histogram_is_blank() {
        let chart = render_histogram_chart(&Histogram::default(), None);
        assert!(chart.pixels().all(|p| *p == CHART_BACKGROUND));
    }

    #[test]
    fn test_write_report_creates_output_folder() {
        let dir = tempfile::tempdir().unwrap();
        let anchor = dir.path().join("dark.png");
        let path = write_report(&analysis(), &Config::default(), &anchor, true).unwrap();
        assert!(path.starts_with(dir.path().join("Adjusted")));
        assert!(path.extension().is_some_and(|ext| ext == "htm"));
        assert!(dir.path().join("Adjusted/histograms/2-light.png.png").exists());
    }

    #[test]
    fn test_charts_of_same_named_inputs_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let mut analysis = analysis();
        analysis.records[0].path = PathBuf::from("roll1/scan.png");
        analysis.records[1].path = PathBuf::from("roll2/scan.png");

        let anchor = dir.path().join("scan.png");
        let path = write_report(&analysis, &Config::default(), &anchor, true).unwrap();

        let charts = dir.path().join("Adjusted/histograms");
        assert!(charts.join("1-scan.png.png").exists());
        assert!(charts.join("2-scan.png.png").exists());
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("src=\"histograms/1-scan.png.png\""));
        assert!(html.contains("src=\"histograms/2-scan.png.png\""));
    }
}
