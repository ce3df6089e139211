//! Class score analysis: load a score sheet, compute per-class statistics,
//! chart them and write a `.docx` report.

pub mod buckets;
pub mod charts;
pub mod config;
pub mod docx;
pub mod error;
pub mod report;
pub mod sheet;
pub mod stats;
pub mod summary;

use std::path::Path;

pub use buckets::{BucketScheme, ScoreBucket};
pub use charts::{ChartRenderer, Renderer};
pub use config::ReportConfig;
pub use error::{ChartError, ConfigError, LoadError, SubjectError};
pub use sheet::ScoreTable;
pub use stats::{ClassStatistics, SubjectStats};

/// Outcome of a full run. The statistics are available even when saving the
/// document failed.
#[derive(Debug)]
pub struct RunOutcome {
    pub statistics: ClassStatistics,
    pub saved: anyhow::Result<()>,
}

/// Load `input`, analyse it and write the report to `output`.
///
/// Only load failures abort the run; chart and save failures are reported
/// through the log and `RunOutcome::saved`.
pub fn generate_report(
    input: &Path,
    output: &Path,
    config: &ReportConfig,
    renderer: &dyn ChartRenderer,
) -> Result<RunOutcome, LoadError> {
    let table = sheet::load_score_table(input, config)?;
    let statistics = stats::aggregate(&table, &config.buckets, &config.thresholds);
    let document = report::build_report(&table, &statistics, renderer, &config.title);
    log::info!(
        "report assembled: {} classes, {} charts",
        statistics.classes.len(),
        document.picture_count()
    );
    let saved = document.save(output);
    Ok(RunOutcome { statistics, saved })
}
