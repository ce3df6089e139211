use serde::Serialize;

use crate::buckets::BucketScheme;
use crate::config::Thresholds;
use crate::error::SubjectError;
use crate::sheet::{Cell, ScoreTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Summary metrics of one (class, subject) pair. Rates are percentages of the
/// class's row count; NaN marks a value with no defined result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub mean: f64,
    pub pass_rate: f64,
    pub excellence_rate: f64,
    pub fail_rate: f64,
    pub std_dev: f64,
    pub group_size: usize,
    pub missing: usize,
    pub distribution: Vec<BucketCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SubjectOutcome {
    Computed(SubjectStats),
    Failed { reason: String },
}

impl SubjectOutcome {
    pub fn stats(&self) -> Option<&SubjectStats> {
        match self {
            SubjectOutcome::Computed(s) => Some(s),
            SubjectOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntry {
    pub subject: String,
    pub outcome: SubjectOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    pub class: String,
    pub student_count: usize,
    pub subjects: Vec<SubjectEntry>,
}

/// class -> subject -> outcome, in report order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStatistics {
    pub classes: Vec<ClassEntry>,
}

impl ClassStatistics {
    pub fn class(&self, class: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.class == class)
    }

    pub fn outcome(&self, class: &str, subject: &str) -> Option<&SubjectOutcome> {
        self.class(class)?
            .subjects
            .iter()
            .find(|s| s.subject == subject)
            .map(|s| &s.outcome)
    }

    pub fn get(&self, class: &str, subject: &str) -> Option<&SubjectStats> {
        self.outcome(class, subject)?.stats()
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); NaN below two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Compute the statistics of one group. `scores` holds one entry per row of
/// the class; `None` is a missing cell and only enlarges the denominators.
pub fn compute_subject_stats(
    scores: &[Option<f64>],
    scheme: &BucketScheme,
    thresholds: &Thresholds,
) -> SubjectStats {
    let present: Vec<f64> = scores.iter().flatten().copied().collect();
    let group_size = scores.len();

    let pass = present.iter().filter(|v| **v >= thresholds.pass).count();
    let excellent = present.iter().filter(|v| **v >= thresholds.excellence).count();
    let fail = present.iter().filter(|v| **v < thresholds.pass).count();

    let mut counts = vec![0usize; scheme.len()];
    for v in &present {
        if let Some(i) = scheme.index_of(*v) {
            counts[i] += 1;
        }
    }

    SubjectStats {
        mean: mean(&present),
        pass_rate: percent(pass, group_size),
        excellence_rate: percent(excellent, group_size),
        fail_rate: percent(fail, group_size),
        std_dev: sample_std_dev(&present),
        group_size,
        missing: group_size - present.len(),
        distribution: scheme
            .buckets()
            .iter()
            .zip(counts)
            .map(|(b, count)| BucketCount {
                label: b.label.clone(),
                count,
                percentage: percent(count, group_size),
            })
            .collect(),
    }
}

/// Reject a subject column holding any non-numeric cell.
pub fn check_subject_column(table: &ScoreTable, subject_idx: usize) -> Result<(), SubjectError> {
    let subject = &table.subjects()[subject_idx];
    for row in table.rows() {
        if let Some(Cell::Invalid(value)) = row.cells.get(subject_idx) {
            return Err(SubjectError::NonNumeric {
                subject: subject.clone(),
                row: row.sheet_row,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Scores of one class for one subject, one entry per row in sheet order.
pub fn class_scores(table: &ScoreTable, class: &str, subject_idx: usize) -> Vec<Option<f64>> {
    table
        .class_rows(class)
        .map(|r| r.cells.get(subject_idx).and_then(Cell::as_number))
        .collect()
}

/// Group the table by class and compute every (class, subject) pair.
pub fn aggregate(
    table: &ScoreTable,
    scheme: &BucketScheme,
    thresholds: &Thresholds,
) -> ClassStatistics {
    let column_checks: Vec<Result<(), SubjectError>> = (0..table.subjects().len())
        .map(|i| check_subject_column(table, i))
        .collect();
    for e in column_checks.iter().filter_map(|c| c.as_ref().err()) {
        log::error!("{}", e);
    }

    let classes = table
        .class_ids()
        .into_iter()
        .map(|class| {
            let student_count = table.class_rows(&class).count();
            let subjects = table
                .subjects()
                .iter()
                .enumerate()
                .map(|(i, subject)| {
                    let outcome = match &column_checks[i] {
                        Err(e) => SubjectOutcome::Failed {
                            reason: e.to_string(),
                        },
                        Ok(()) => {
                            let scores = class_scores(table, &class, i);
                            warn_unbucketed(&class, subject, &scores, scheme);
                            SubjectOutcome::Computed(compute_subject_stats(
                                &scores, scheme, thresholds,
                            ))
                        }
                    };
                    SubjectEntry {
                        subject: subject.clone(),
                        outcome,
                    }
                })
                .collect();
            ClassEntry {
                class,
                student_count,
                subjects,
            }
        })
        .collect();

    ClassStatistics { classes }
}

fn warn_unbucketed(class: &str, subject: &str, scores: &[Option<f64>], scheme: &BucketScheme) {
    for v in scores.iter().flatten() {
        if scheme.index_of(*v).is_none() {
            log::warn!(
                "class {} subject {}: score {} is outside every score band",
                class,
                subject,
                v
            );
        }
    }
}
