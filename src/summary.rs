use std::fmt::Write;

use crate::report::{fmt_number, fmt_percent};
use crate::stats::{ClassStatistics, SubjectOutcome};

/// Plain-text rendition of the statistics for the console.
pub fn render_summary(stats: &ClassStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Statistics per class and subject:");
    for class in &stats.classes {
        let _ = writeln!(out, "\nClass {} ({} students):", class.class, class.student_count);
        for entry in &class.subjects {
            let _ = writeln!(out, "\n  {}:", entry.subject);
            let st = match &entry.outcome {
                SubjectOutcome::Computed(st) => st,
                SubjectOutcome::Failed { reason } => {
                    let _ = writeln!(out, "    unavailable: {}", reason);
                    continue;
                }
            };
            let _ = writeln!(out, "    Mean: {}", fmt_number(st.mean));
            let _ = writeln!(out, "    Pass rate: {}", fmt_percent(st.pass_rate));
            let _ = writeln!(out, "    Excellence rate: {}", fmt_percent(st.excellence_rate));
            let _ = writeln!(out, "    Fail rate: {}", fmt_percent(st.fail_rate));
            let _ = writeln!(out, "    Standard deviation: {}", fmt_number(st.std_dev));
            if st.missing > 0 {
                let _ = writeln!(out, "    Missing scores: {}", st.missing);
            }
            let _ = writeln!(out, "    Score bands:");
            for b in &st.distribution {
                let _ = writeln!(
                    out,
                    "      {}: {} students ({})",
                    b.label,
                    b.count,
                    fmt_percent(b.percentage)
                );
            }
        }
    }
    out
}
