use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures while reading the score spreadsheet.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("score file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to open spreadsheet {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("spreadsheet {0} has no worksheet")]
    NoWorksheet(PathBuf),
    #[error("worksheet has no header row")]
    MissingHeader,
    #[error("no class column found (expected one of: {expected})")]
    MissingClassColumn { expected: String },
    #[error("no subject columns found besides the identifier columns")]
    NoSubjects,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid score buckets: {0}")]
    InvalidBuckets(String),
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
    #[error("invalid column settings: {0}")]
    InvalidColumns(String),
    #[error("invalid chart settings: {0}")]
    InvalidCharts(String),
}

/// Why statistics for one subject could not be computed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubjectError {
    #[error("non-numeric value '{value}' in column '{subject}' at row {row}")]
    NonNumeric {
        subject: String,
        row: usize,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to create chart file: {0}")]
    TempFile(#[from] std::io::Error),
    #[error("failed to draw chart: {0}")]
    Drawing(String),
    #[error("no data to plot: {0}")]
    NoData(String),
}
