use std::fmt::Display;

use crate::charts::{
    ChartArtifact, ChartRenderer, ComparisonChart, ComparisonInput, SubjectChart,
    SubjectChartInput,
};
use crate::docx::{Document, Picture};
use crate::error::ChartError;
use crate::sheet::ScoreTable;
use crate::stats::{class_scores, ClassStatistics, SubjectOutcome, SubjectStats};

/// Placeholder for values that are undefined (empty groups, single scores).
pub const NOT_AVAILABLE: &str = "N/A";

pub fn fmt_number(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}", v)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

pub fn fmt_percent(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}%", v)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

/// Key/value rows of the summary table.
pub fn summary_rows(stats: &SubjectStats) -> Vec<Vec<String>> {
    vec![
        vec!["Mean".to_string(), fmt_number(stats.mean)],
        vec!["Pass rate".to_string(), fmt_percent(stats.pass_rate)],
        vec!["Excellence rate".to_string(), fmt_percent(stats.excellence_rate)],
        vec!["Fail rate".to_string(), fmt_percent(stats.fail_rate)],
        vec!["Standard deviation".to_string(), fmt_number(stats.std_dev)],
    ]
}

/// Header row plus one row per score band.
pub fn bucket_rows(stats: &SubjectStats) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Score band".to_string(),
        "Students".to_string(),
        "Share".to_string(),
    ]];
    rows.extend(stats.distribution.iter().map(|b| {
        vec![
            b.label.clone(),
            b.count.to_string(),
            fmt_percent(b.percentage),
        ]
    }));
    rows
}

/// Assemble the whole report. Chart failures are logged and the chart left out.
pub fn build_report(
    table: &ScoreTable,
    stats: &ClassStatistics,
    renderer: &dyn ChartRenderer,
    title: &str,
) -> Document {
    let mut doc = Document::new();
    doc.add_heading(title, 0);

    for class in &stats.classes {
        doc.add_heading(format!("Class {} analysis", class.class), 1);
        for entry in &class.subjects {
            doc.add_heading(format!("{} analysis", entry.subject), 2);
            let st = match &entry.outcome {
                SubjectOutcome::Computed(st) => st,
                SubjectOutcome::Failed { reason } => {
                    doc.add_paragraph(format!("Statistics unavailable: {}", reason));
                    continue;
                }
            };

            doc.add_heading("Summary statistics", 3);
            doc.add_table(summary_rows(st));
            doc.add_heading("Score bands", 3);
            doc.add_table(bucket_rows(st));

            doc.add_heading("Charts", 3);
            let Some(subject_idx) = table.subjects().iter().position(|s| *s == entry.subject) else {
                continue;
            };
            let scores: Vec<f64> = class_scores(table, &class.class, subject_idx)
                .into_iter()
                .flatten()
                .collect();
            if scores.is_empty() {
                doc.add_paragraph("No scores recorded; charts omitted.");
                continue;
            }
            let input = SubjectChartInput {
                class: &class.class,
                subject: &entry.subject,
                scores: &scores,
                stats: st,
            };
            for kind in SubjectChart::ALL {
                let chart = renderer.subject_chart(kind, &input);
                embed_chart(
                    &mut doc,
                    chart,
                    renderer.image_width_inches(),
                    format_args!("class {} subject {} {}", class.class, entry.subject, kind.as_str()),
                );
            }
        }
    }

    doc.add_heading("Class comparison", 1);
    for subject in table.subjects() {
        doc.add_heading(format!("{} class comparison", subject), 2);
        let Some(input) = ComparisonInput::from_stats(stats, subject) else {
            let reason = stats
                .classes
                .iter()
                .find_map(|c| match c.subjects.iter().find(|s| s.subject == *subject) {
                    Some(s) => match &s.outcome {
                        SubjectOutcome::Failed { reason } => Some(reason.clone()),
                        SubjectOutcome::Computed(_) => None,
                    },
                    None => None,
                })
                .unwrap_or_else(|| "no class has scores".to_string());
            doc.add_paragraph(format!("Statistics unavailable: {}", reason));
            continue;
        };
        for kind in ComparisonChart::ALL {
            let chart = renderer.comparison_chart(kind, &input);
            embed_chart(
                &mut doc,
                chart,
                renderer.image_width_inches(),
                format_args!("subject {} {}", subject, kind.as_str()),
            );
        }
    }

    doc
}

/// Consume a rendered chart. The artifact is dropped, and its file removed,
/// before returning on every path.
fn embed_chart(
    doc: &mut Document,
    chart: Result<ChartArtifact, ChartError>,
    width_inches: f64,
    what: impl Display,
) -> bool {
    let artifact = match chart {
        Ok(a) => a,
        Err(e) => {
            log::warn!("skipping {}: {}", what, e);
            return false;
        }
    };
    match artifact.read_bytes() {
        Ok(png) => {
            doc.add_picture(Picture {
                png,
                width_px: artifact.width(),
                height_px: artifact.height(),
                width_inches,
            });
            true
        }
        Err(e) => {
            log::warn!("skipping {}: failed to read chart image: {}", what, e);
            false
        }
    }
}
