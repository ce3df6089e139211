//! Chart rendering.
//!
//! Every chart is drawn with [`plotters`] into its own temporary PNG. The file
//! lives exactly as long as the returned [`ChartArtifact`], so an artifact that
//! is dropped (embedded or not) never leaves anything behind.

use std::cmp::Ordering;
use std::f64::consts::PI;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use plotters::coord::Shift;
use plotters::drawing::DrawingArea;
use plotters::prelude::*;
use plotters::style::FontStyle;
use tempfile::NamedTempFile;

use crate::config::ChartConfig;
use crate::error::ChartError;
use crate::stats::{ClassStatistics, SubjectStats};

const FONT_FAMILY: &str = "markreport-sans";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// A rendered chart staged on disk. Dropping it deletes the file.
#[derive(Debug)]
pub struct ChartArtifact {
    file: NamedTempFile,
    width: u32,
    height: u32,
}

impl ChartArtifact {
    pub fn new(file: NamedTempFile, width: u32, height: u32) -> Self {
        Self {
            file,
            width,
            height,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.file.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectChart {
    Histogram,
    BoxPlot,
    Pie,
    Bar,
    Trend,
}

impl SubjectChart {
    /// Order in which the charts appear in a subject section.
    pub const ALL: [SubjectChart; 5] = [
        SubjectChart::Histogram,
        SubjectChart::BoxPlot,
        SubjectChart::Pie,
        SubjectChart::Bar,
        SubjectChart::Trend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubjectChart::Histogram => "histogram",
            SubjectChart::BoxPlot => "box plot",
            SubjectChart::Pie => "pie chart",
            SubjectChart::Bar => "bar chart",
            SubjectChart::Trend => "trend chart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonChart {
    ClassMeans,
    BucketShares,
}

impl ComparisonChart {
    pub const ALL: [ComparisonChart; 2] = [ComparisonChart::ClassMeans, ComparisonChart::BucketShares];

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonChart::ClassMeans => "class mean chart",
            ComparisonChart::BucketShares => "score band share chart",
        }
    }
}

/// Data for the per-(class, subject) charts. `scores` holds present scores only.
#[derive(Debug, Clone, Copy)]
pub struct SubjectChartInput<'a> {
    pub class: &'a str,
    pub subject: &'a str,
    pub scores: &'a [f64],
    pub stats: &'a SubjectStats,
}

/// Data for the cross-class charts of one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonInput {
    pub subject: String,
    pub classes: Vec<String>,
    pub means: Vec<f64>,
    pub bucket_labels: Vec<String>,
    /// Per class, the bucket percentages in scheme order.
    pub shares: Vec<Vec<f64>>,
}

impl ComparisonInput {
    /// Collect the classes whose statistics for `subject` were computed.
    pub fn from_stats(stats: &ClassStatistics, subject: &str) -> Option<Self> {
        let mut input = ComparisonInput {
            subject: subject.to_string(),
            classes: Vec::new(),
            means: Vec::new(),
            bucket_labels: Vec::new(),
            shares: Vec::new(),
        };
        for class in &stats.classes {
            let Some(st) = stats.get(&class.class, subject) else {
                continue;
            };
            if input.bucket_labels.is_empty() {
                input.bucket_labels = st.distribution.iter().map(|b| b.label.clone()).collect();
            }
            input.classes.push(class.class.clone());
            input.means.push(st.mean);
            input
                .shares
                .push(st.distribution.iter().map(|b| b.percentage).collect());
        }
        if input.classes.is_empty() {
            None
        } else {
            Some(input)
        }
    }
}

/// Source of chart images for the report builder.
pub trait ChartRenderer {
    fn subject_chart(
        &self,
        kind: SubjectChart,
        input: &SubjectChartInput<'_>,
    ) -> Result<ChartArtifact, ChartError>;

    fn comparison_chart(
        &self,
        kind: ComparisonChart,
        input: &ComparisonInput,
    ) -> Result<ChartArtifact, ChartError>;

    /// Display width of embedded charts.
    fn image_width_inches(&self) -> f64 {
        6.0
    }
}

/// Histogram bin `[low, high)`; the last bin of a set is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub low: f64,
    pub high: f64,
    pub count: usize,
}

/// Split the observed score range into `bins` equal-width bins.
pub fn histogram_bins(scores: &[f64], bins: usize) -> Vec<HistogramBin> {
    if scores.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            low: lo + width * i as f64,
            high: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for v in scores {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Five-number box plot summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

/// Quantile of sorted data with linear interpolation between ranks.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

impl BoxSummary {
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let reach = 1.5 * (q3 - q1);
        let (lo_fence, hi_fence) = (q1 - reach, q3 + reach);
        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= lo_fence && *v <= hi_fence)
            .collect();
        Some(Self {
            q1,
            median,
            q3,
            whisker_low: inside.first().copied().unwrap_or(q1),
            whisker_high: inside.last().copied().unwrap_or(q3),
            outliers: sorted
                .iter()
                .copied()
                .filter(|v| *v < lo_fence || *v > hi_fence)
                .collect(),
        })
    }
}

/// Scores sorted from best to worst, indexed by rank.
pub fn trend_points(scores: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i as f64, v))
        .collect()
}

/// One pie slice. `share` is the fraction of the banded scores, so the slices
/// of a chart always add up to a full circle.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    /// Index of the band in the scheme, for a stable colour.
    pub bucket: usize,
    pub label: String,
    pub share: f64,
}

/// Slices for the non-empty bands of `stats`; empty when no score is banded.
pub fn pie_slices(stats: &SubjectStats) -> Vec<PieSlice> {
    let total: usize = stats.distribution.iter().map(|b| b.count).sum();
    if total == 0 {
        return Vec::new();
    }
    stats
        .distribution
        .iter()
        .enumerate()
        .filter(|(_, b)| b.count > 0)
        .map(|(i, b)| PieSlice {
            bucket: i,
            label: b.label.clone(),
            share: b.count as f64 / total as f64,
        })
        .collect()
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

/// Padded value range for a score axis.
fn score_axis(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 100.0);
    }
    ((lo - 5.0).floor(), (hi + 5.0).ceil())
}

/// The plotters-backed renderer.
#[derive(Debug)]
pub struct Renderer {
    config: ChartConfig,
    font: Option<&'static str>,
}

impl Renderer {
    pub fn new(config: ChartConfig) -> Self {
        let font = register_font(&config);
        if font.is_none() {
            log::warn!("no usable chart font found; charts are drawn without text");
        }
        Self { config, font }
    }

    /// A renderer that never draws text, independent of installed fonts.
    pub fn without_text(config: ChartConfig) -> Self {
        Self { config, font: None }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn has_text(&self) -> bool {
        self.font.is_some()
    }

    fn new_artifact(&self) -> Result<NamedTempFile, ChartError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("markreport-chart-").suffix(".png");
        let file = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    fn draw<F>(&self, paint: F) -> Result<ChartArtifact, ChartError>
    where
        F: FnOnce(&Area<'_>) -> Result<(), ChartError>,
    {
        let file = self.new_artifact()?;
        let (w, h) = (self.config.width, self.config.height);
        {
            let root = BitMapBackend::new(file.path(), (w, h)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            paint(&root)?;
            root.present().map_err(draw_err)?;
        }
        Ok(ChartArtifact::new(file, w, h))
    }

    fn builder<'a, 'b>(
        &self,
        root: &'a Area<'b>,
        title: &str,
    ) -> ChartBuilder<'a, 'static, BitMapBackend<'b>> {
        let mut builder = ChartBuilder::on(root);
        builder.margin(20);
        if let Some(font) = self.font {
            builder
                .caption(title, (font, 26).into_font())
                .x_label_area_size(45)
                .y_label_area_size(60);
        }
        builder
    }

    fn histogram(&self, input: &SubjectChartInput<'_>) -> Result<ChartArtifact, ChartError> {
        let bins = histogram_bins(input.scores, self.config.histogram_bins);
        let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
            return Err(ChartError::NoData("no scores".to_string()));
        };
        let (x0, x1) = (first.low, last.high);
        let top = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64 + 1.0;
        let title = format!("Class {} {} score distribution", input.class, input.subject);
        self.draw(|root| {
            let mut chart = self
                .builder(root, &title)
                .build_cartesian_2d(x0..x1, 0f64..top)
                .map_err(draw_err)?;
            if let Some(font) = self.font {
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_desc("Score")
                    .y_desc("Frequency")
                    .label_style((font, 15).into_font())
                    .axis_desc_style((font, 17).into_font())
                    .draw()
                    .map_err(draw_err)?;
            }
            chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.low, 0.0), (b.high, b.count as f64)], BLUE.mix(0.6).filled())
                }))
                .map_err(draw_err)?;
            chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.low, 0.0), (b.high, b.count as f64)], BLACK.stroke_width(1))
                }))
                .map_err(draw_err)?;
            Ok(())
        })
    }

    fn box_plot(&self, input: &SubjectChartInput<'_>) -> Result<ChartArtifact, ChartError> {
        let summary = BoxSummary::from_scores(input.scores)
            .ok_or_else(|| ChartError::NoData("no scores".to_string()))?;
        let (y0, y1) = score_axis(input.scores);
        let title = format!("Class {} {} box plot", input.class, input.subject);
        self.draw(|root| {
            let mut chart = self
                .builder(root, &title)
                .build_cartesian_2d(0f64..2f64, y0..y1)
                .map_err(draw_err)?;
            if let Some(font) = self.font {
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(0)
                    .y_desc("Score")
                    .label_style((font, 15).into_font())
                    .axis_desc_style((font, 17).into_font())
                    .draw()
                    .map_err(draw_err)?;
            }
            let (left, right) = (0.7, 1.3);
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(left, summary.q1), (right, summary.q3)],
                    BLUE.mix(0.25).filled(),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(left, summary.q1), (right, summary.q3)],
                    BLACK.stroke_width(2),
                )))
                .map_err(draw_err)?;
            let whiskers = vec![
                vec![(1.0, summary.q3), (1.0, summary.whisker_high)],
                vec![(1.0, summary.q1), (1.0, summary.whisker_low)],
                vec![(0.85, summary.whisker_high), (1.15, summary.whisker_high)],
                vec![(0.85, summary.whisker_low), (1.15, summary.whisker_low)],
            ];
            chart
                .draw_series(
                    whiskers
                        .into_iter()
                        .map(|p| PathElement::new(p, BLACK.stroke_width(2))),
                )
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(left, summary.median), (right, summary.median)],
                    RED.stroke_width(3),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series(
                    summary
                        .outliers
                        .iter()
                        .map(|v| Circle::new((1.0, *v), 4, BLACK.stroke_width(1))),
                )
                .map_err(draw_err)?;
            Ok(())
        })
    }

    fn pie(&self, input: &SubjectChartInput<'_>) -> Result<ChartArtifact, ChartError> {
        let slices = pie_slices(input.stats);
        if slices.is_empty() {
            return Err(ChartError::NoData("no scores inside the score bands".to_string()));
        }
        let title = format!("Class {} {} score bands", input.class, input.subject);
        let (w, h) = (self.config.width as f64, self.config.height as f64);
        self.draw(|root| {
            let area = match self.font {
                Some(font) => root.titled(&title, (font, 26).into_font()).map_err(draw_err)?,
                None => root.clone(),
            };
            let (cx, cy) = (w / 2.0, h / 2.0 - 20.0);
            let radius = w.min(h) * 0.32;
            let mut start = -PI / 2.0;
            for slice in &slices {
                let sweep = slice.share * 2.0 * PI;
                let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;
                let mut points = vec![(cx as i32, cy as i32)];
                for s in 0..=steps {
                    let a = start + sweep * s as f64 / steps as f64;
                    points.push((
                        (cx + radius * a.cos()).round() as i32,
                        (cy + radius * a.sin()).round() as i32,
                    ));
                }
                let color = Palette99::pick(slice.bucket).to_rgba();
                area.draw(&Polygon::new(points, color.filled()))
                    .map_err(draw_err)?;
                if let Some(font) = self.font {
                    let mid = start + sweep / 2.0;
                    let label = format!("{} {:.1}%", slice.label, slice.share * 100.0);
                    let pos = (
                        (cx + radius * 1.15 * mid.cos()).round() as i32 - 30,
                        (cy + radius * 1.15 * mid.sin()).round() as i32,
                    );
                    area.draw(&Text::new(label, pos, (font, 17).into_font()))
                        .map_err(draw_err)?;
                }
                start += sweep;
            }
            Ok(())
        })
    }

    fn bucket_bar(&self, input: &SubjectChartInput<'_>) -> Result<ChartArtifact, ChartError> {
        let dist = &input.stats.distribution;
        if dist.iter().all(|b| b.count == 0) {
            return Err(ChartError::NoData("no scores inside the score bands".to_string()));
        }
        let labels: Vec<String> = dist.iter().map(|b| b.label.clone()).collect();
        let top = dist.iter().map(|b| b.count).max().unwrap_or(0) as f64 + 1.0;
        let title = format!("Class {} {} students per score band", input.class, input.subject);
        self.draw(|root| {
            let mut chart = self
                .builder(root, &title)
                .build_cartesian_2d((0usize..labels.len()).into_segmented(), 0f64..top)
                .map_err(draw_err)?;
            if let Some(font) = self.font {
                let fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(labels.len())
                    .x_label_formatter(&fmt)
                    .x_desc("Score band")
                    .y_desc("Students")
                    .label_style((font, 15).into_font())
                    .axis_desc_style((font, 17).into_font())
                    .draw()
                    .map_err(draw_err)?;
            }
            chart
                .draw_series(dist.iter().enumerate().map(|(i, b)| {
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::Exact(i), 0.0),
                            (SegmentValue::Exact(i + 1), b.count as f64),
                        ],
                        BLUE.mix(0.7).filled(),
                    );
                    bar.set_margin(0, 0, 12, 12);
                    bar
                }))
                .map_err(draw_err)?;
            Ok(())
        })
    }

    fn trend(&self, input: &SubjectChartInput<'_>) -> Result<ChartArtifact, ChartError> {
        let points = trend_points(input.scores);
        if points.is_empty() {
            return Err(ChartError::NoData("no scores".to_string()));
        }
        let mean = input.stats.mean;
        let x1 = (points.len() as f64 - 1.0).max(1.0);
        let (y0, y1) = score_axis(input.scores);
        let title = format!("Class {} {} ranking trend", input.class, input.subject);
        self.draw(|root| {
            let mut chart = self
                .builder(root, &title)
                .build_cartesian_2d(0f64..x1, y0..y1)
                .map_err(draw_err)?;
            if let Some(font) = self.font {
                chart
                    .configure_mesh()
                    .x_desc("Rank")
                    .y_desc("Score")
                    .label_style((font, 15).into_font())
                    .axis_desc_style((font, 17).into_font())
                    .draw()
                    .map_err(draw_err)?;
            }
            chart
                .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))
                .map_err(draw_err)?;
            if mean.is_finite() {
                chart
                    .draw_series(LineSeries::new(
                        vec![(0.0, mean), (x1, mean)],
                        RED.stroke_width(2),
                    ))
                    .map_err(draw_err)?
                    .label(format!("mean {:.1}", mean))
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
            }
            if let Some(font) = self.font {
                chart
                    .configure_series_labels()
                    .label_font((font, 15).into_font())
                    .background_style(WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .draw()
                    .map_err(draw_err)?;
            }
            Ok(())
        })
    }

    fn class_means(&self, input: &ComparisonInput) -> Result<ChartArtifact, ChartError> {
        if input.means.iter().all(|m| !m.is_finite()) {
            return Err(ChartError::NoData(format!("no class mean for {}", input.subject)));
        }
        let labels = input.classes.clone();
        let title = format!("{} mean score by class", input.subject);
        self.draw(|root| {
            let mut chart = self
                .builder(root, &title)
                .build_cartesian_2d((0usize..labels.len()).into_segmented(), 0f64..100f64)
                .map_err(draw_err)?;
            if let Some(font) = self.font {
                let fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(labels.len())
                    .x_label_formatter(&fmt)
                    .x_desc("Class")
                    .y_desc("Mean score")
                    .label_style((font, 15).into_font())
                    .axis_desc_style((font, 17).into_font())
                    .draw()
                    .map_err(draw_err)?;
            }
            chart
                .draw_series(
                    input
                        .means
                        .iter()
                        .enumerate()
                        .filter(|(_, m)| m.is_finite())
                        .map(|(i, m)| {
                            let mut bar = Rectangle::new(
                                [
                                    (SegmentValue::Exact(i), 0.0),
                                    (SegmentValue::Exact(i + 1), m.clamp(0.0, 100.0)),
                                ],
                                BLUE.mix(0.7).filled(),
                            );
                            bar.set_margin(0, 0, 15, 15);
                            bar
                        }),
                )
                .map_err(draw_err)?;
            Ok(())
        })
    }

    fn bucket_shares(&self, input: &ComparisonInput) -> Result<ChartArtifact, ChartError> {
        if input.bucket_labels.is_empty() {
            return Err(ChartError::NoData("no score bands".to_string()));
        }
        let labels = input.classes.clone();
        let title = format!("{} score band share by class", input.subject);
        self.draw(|root| {
            let mut chart = self
                .builder(root, &title)
                .build_cartesian_2d((0usize..labels.len()).into_segmented(), 0f64..100f64)
                .map_err(draw_err)?;
            if let Some(font) = self.font {
                let fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(labels.len())
                    .x_label_formatter(&fmt)
                    .x_desc("Class")
                    .y_desc("Share (%)")
                    .label_style((font, 15).into_font())
                    .axis_desc_style((font, 17).into_font())
                    .draw()
                    .map_err(draw_err)?;
            }
            let mut bottom = vec![0f64; labels.len()];
            for (b, label) in input.bucket_labels.iter().enumerate() {
                let color = Palette99::pick(b).to_rgba();
                let bars: Vec<_> = input
                    .shares
                    .iter()
                    .enumerate()
                    .map(|(i, shares)| {
                        let pct = shares.get(b).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
                        let base = bottom[i];
                        bottom[i] += pct;
                        let mut bar = Rectangle::new(
                            [
                                (SegmentValue::Exact(i), base),
                                (SegmentValue::Exact(i + 1), (base + pct).min(100.0)),
                            ],
                            color.filled(),
                        );
                        bar.set_margin(0, 0, 15, 15);
                        bar
                    })
                    .collect();
                chart
                    .draw_series(bars)
                    .map_err(draw_err)?
                    .label(label.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
            }
            if let Some(font) = self.font {
                chart
                    .configure_series_labels()
                    .label_font((font, 15).into_font())
                    .background_style(WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .position(SeriesLabelPosition::UpperRight)
                    .draw()
                    .map_err(draw_err)?;
            }
            Ok(())
        })
    }
}

impl ChartRenderer for Renderer {
    fn subject_chart(
        &self,
        kind: SubjectChart,
        input: &SubjectChartInput<'_>,
    ) -> Result<ChartArtifact, ChartError> {
        match kind {
            SubjectChart::Histogram => self.histogram(input),
            SubjectChart::BoxPlot => self.box_plot(input),
            SubjectChart::Pie => self.pie(input),
            SubjectChart::Bar => self.bucket_bar(input),
            SubjectChart::Trend => self.trend(input),
        }
    }

    fn comparison_chart(
        &self,
        kind: ComparisonChart,
        input: &ComparisonInput,
    ) -> Result<ChartArtifact, ChartError> {
        match kind {
            ComparisonChart::ClassMeans => self.class_means(input),
            ComparisonChart::BucketShares => self.bucket_shares(input),
        }
    }

    fn image_width_inches(&self) -> f64 {
        self.config.image_width_inches
    }
}

fn segment_label(labels: &[String], v: &SegmentValue<usize>) -> String {
    match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            labels.get(*i).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

/// Register the configured (or first available system) font with plotters and
/// return the family name to draw with.
fn register_font(config: &ChartConfig) -> Option<&'static str> {
    let candidates: Vec<PathBuf> = match &config.font_path {
        Some(p) => vec![p.clone()],
        None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };
    let path = candidates.into_iter().find(|p| p.is_file())?;
    registered_font(&path)
}

/// Family name of the font at `path`, registering it on first use. Each path
/// is read and registered at most once per process, failures included.
fn registered_font(path: &Path) -> Option<&'static str> {
    static FONTS: OnceLock<Mutex<HashMap<PathBuf, Option<&'static str>>>> = OnceLock::new();
    let mut fonts = FONTS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(family) = fonts.get(path) {
        return *family;
    }
    let family = load_font(path, fonts.len());
    fonts.insert(path.to_path_buf(), family);
    family
}

fn load_font(path: &Path, seq: usize) -> Option<&'static str> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("failed to read font {}: {}", path.to_string_lossy(), e);
            return None;
        }
    };
    // plotters keeps registered faces for the rest of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    let family: &'static str = Box::leak(format!("{}-{}", FONT_FAMILY, seq).into_boxed_str());
    match plotters::style::register_font(family, FontStyle::Normal, bytes) {
        Ok(()) => {
            log::debug!("chart font: {}", path.to_string_lossy());
            Some(family)
        }
        Err(_) => {
            log::warn!("font {} is not usable", path.to_string_lossy());
            None
        }
    }
}
