use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::buckets::BucketScheme;
use crate::error::ConfigError;

pub const DEFAULT_TITLE: &str = "Class Score Analysis Report";
pub const DEFAULT_OUTPUT: &str = "Class Score Analysis Report.docx";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportConfig {
    pub title: String,
    /// Header names accepted for the class column, first match wins.
    pub class_column: Vec<String>,
    /// Header names that are never treated as subjects.
    pub identifier_columns: Vec<String>,
    pub thresholds: Thresholds,
    pub buckets: BucketScheme,
    pub charts: ChartConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            class_column: vec!["class".to_string(), "班级".to_string()],
            identifier_columns: ["class", "index", "name", "班级", "序号", "姓名"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            thresholds: Thresholds::default(),
            buckets: BucketScheme::default(),
            charts: ChartConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
    pub pass: f64,
    pub excellence: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pass: 60.0,
            excellence: 90.0,
        }
    }
}

/// Rendering settings handed to the chart renderer at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub histogram_bins: usize,
    /// TrueType/OpenType font for chart text. When unset a few common system
    /// locations are searched.
    pub font_path: Option<PathBuf>,
    pub image_width_inches: f64,
    /// Where chart files are staged before embedding. Defaults to the system
    /// temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            histogram_bins: 20,
            font_path: None,
            image_width_inches: 6.0,
            temp_dir: None,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        let cfg: ReportConfig = serde_json::from_str(&text)
            .with_context(|| format!("config {} is invalid", path.to_string_lossy()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.thresholds;
        if !(t.pass.is_finite() && t.excellence.is_finite()) || t.pass > t.excellence {
            return Err(ConfigError::InvalidThresholds(format!(
                "pass {} must not exceed excellence {}",
                t.pass, t.excellence
            )));
        }
        if self.class_column.is_empty() {
            return Err(ConfigError::InvalidColumns(
                "classColumn must name at least one header".to_string(),
            ));
        }
        let c = &self.charts;
        if c.width < 100 || c.height < 100 {
            return Err(ConfigError::InvalidCharts(format!(
                "image size {}x{} is too small",
                c.width, c.height
            )));
        }
        if c.histogram_bins == 0 {
            return Err(ConfigError::InvalidCharts(
                "histogramBins must be positive".to_string(),
            ));
        }
        if !(c.image_width_inches > 0.0) {
            return Err(ConfigError::InvalidCharts(
                "imageWidthInches must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
