mod common;

use std::cell::Cell as Counter;

use common::{read_zip_entry, temp_dir, write_two_class_fixture, zip_entry_names};
use markreport::charts::{
    ChartArtifact, ChartRenderer, ComparisonChart, ComparisonInput, SubjectChart,
    SubjectChartInput,
};
use markreport::config::ChartConfig;
use markreport::docx::{Block, Document};
use markreport::report::{build_report, NOT_AVAILABLE};
use markreport::sheet::{Cell, ScoreRow, ScoreTable};
use markreport::stats::aggregate;
use markreport::{generate_report, ChartError, ReportConfig, Renderer};

fn staged_config(dir: &std::path::Path) -> ReportConfig {
    ReportConfig {
        charts: ChartConfig {
            width: 400,
            height: 300,
            temp_dir: Some(dir.to_path_buf()),
            ..ChartConfig::default()
        },
        ..ReportConfig::default()
    }
}

fn headings(doc: &Document, level: u8) -> Vec<String> {
    doc.blocks()
        .iter()
        .filter_map(|b| match b {
            Block::Heading { level: l, text } if *l == level => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn paragraphs(doc: &Document) -> Vec<String> {
    doc.blocks()
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Blocks between the level-2 heading `title` and the next heading of level <= 2.
fn subsection<'a>(doc: &'a Document, title: &str) -> &'a [Block] {
    let blocks = doc.blocks();
    let start = blocks
        .iter()
        .position(|b| matches!(b, Block::Heading { level: 2, text } if text == title))
        .expect("subsection heading");
    let end = blocks[start + 1..]
        .iter()
        .position(|b| matches!(b, Block::Heading { level, .. } if *level <= 2))
        .map(|i| start + 1 + i)
        .unwrap_or(blocks.len());
    &blocks[start + 1..end]
}

fn tables(blocks: &[Block]) -> Vec<&Vec<Vec<String>>> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::Table(rows) => Some(rows),
            _ => None,
        })
        .collect()
}

fn pictures(blocks: &[Block]) -> usize {
    blocks
        .iter()
        .filter(|b| matches!(b, Block::Picture(_)))
        .count()
}

#[test]
fn two_classes_two_subjects_end_to_end() {
    let dir = temp_dir("markreport-e2e");
    let staging = temp_dir("markreport-e2e-charts");
    let input = dir.path().join("scores.xlsx");
    let output = dir.path().join("report.docx");
    write_two_class_fixture(&input);

    let config = staged_config(staging.path());
    let renderer = Renderer::without_text(config.charts.clone());
    let outcome = generate_report(&input, &output, &config, &renderer).expect("report");
    outcome.saved.as_ref().expect("saved");

    let stats = &outcome.statistics;
    assert_eq!(stats.classes.len(), 2);
    let math1 = stats.get("1", "Math").expect("class 1 math");
    assert!((math1.mean - 72.4).abs() < 1e-9);
    assert!((math1.pass_rate - 80.0).abs() < 1e-9);
    assert!((math1.excellence_rate - 20.0).abs() < 1e-9);

    let xml = read_zip_entry(&output, "word/document.xml");
    assert_eq!(xml.matches("<w:tbl>").count(), 8);
    assert_eq!(xml.matches("<w:drawing").count(), 24);
    assert!(xml.contains("Class 1 analysis"));
    assert!(xml.contains("Class 2 analysis"));
    assert!(xml.contains("Math class comparison"));
    assert!(xml.contains("English class comparison"));
    assert!(xml.find("Class 1 analysis") < xml.find("Class 2 analysis"));
    assert!(xml.find("Class 2 analysis") < xml.find("Class comparison"));

    let media = zip_entry_names(&output)
        .into_iter()
        .filter(|n| n.starts_with("word/media/"))
        .count();
    assert_eq!(media, 24);

    assert_eq!(std::fs::read_dir(staging.path()).expect("list").count(), 0);
}

#[test]
fn report_blocks_follow_section_layout() {
    let dir = temp_dir("markreport-layout");
    let input = dir.path().join("scores.xlsx");
    write_two_class_fixture(&input);

    let config = staged_config(dir.path());
    let table = markreport::sheet::load_score_table(&input, &config).expect("load");
    let stats = aggregate(&table, &config.buckets, &config.thresholds);
    let renderer = Renderer::without_text(config.charts.clone());
    let doc = build_report(&table, &stats, &renderer, "Term 1");

    assert_eq!(headings(&doc, 0), vec!["Term 1".to_string()]);
    assert_eq!(
        headings(&doc, 1),
        vec![
            "Class 1 analysis".to_string(),
            "Class 2 analysis".to_string(),
            "Class comparison".to_string(),
        ]
    );
    assert_eq!(
        headings(&doc, 2),
        vec![
            "Math analysis".to_string(),
            "English analysis".to_string(),
            "Math analysis".to_string(),
            "English analysis".to_string(),
            "Math class comparison".to_string(),
            "English class comparison".to_string(),
        ]
    );

    let section = subsection(&doc, "English analysis");
    let t = tables(section);
    assert_eq!(t.len(), 2);
    assert_eq!(t[0].len(), 5);
    assert_eq!(t[1].len(), 6);
    assert_eq!(t[0][0][0], "Mean");
    assert_eq!(t[1][0], vec!["Score band", "Students", "Share"]);
    assert_eq!(pictures(section), 5);

    assert_eq!(pictures(subsection(&doc, "Math class comparison")), 2);
    assert_eq!(pictures(subsection(&doc, "English class comparison")), 2);
    assert_eq!(doc.picture_count(), 24);
}

/// Fails every pie chart and counts how many charts were requested.
struct NoPies {
    inner: Renderer,
    requested: Counter<usize>,
}

impl ChartRenderer for NoPies {
    fn subject_chart(
        &self,
        kind: SubjectChart,
        input: &SubjectChartInput<'_>,
    ) -> Result<ChartArtifact, ChartError> {
        self.requested.set(self.requested.get() + 1);
        match kind {
            SubjectChart::Pie => Err(ChartError::Drawing("backend unavailable".to_string())),
            other => self.inner.subject_chart(other, input),
        }
    }

    fn comparison_chart(
        &self,
        kind: ComparisonChart,
        input: &ComparisonInput,
    ) -> Result<ChartArtifact, ChartError> {
        self.requested.set(self.requested.get() + 1);
        self.inner.comparison_chart(kind, input)
    }
}

#[test]
fn failed_chart_is_omitted_and_the_rest_kept() {
    let dir = temp_dir("markreport-nopie");
    let input = dir.path().join("scores.xlsx");
    let output = dir.path().join("report.docx");
    write_two_class_fixture(&input);

    let staging = temp_dir("markreport-nopie-charts");
    let config = staged_config(staging.path());
    let renderer = NoPies {
        inner: Renderer::without_text(config.charts.clone()),
        requested: Counter::new(0),
    };
    let outcome = generate_report(&input, &output, &config, &renderer).expect("report");
    assert!(outcome.saved.is_ok());
    assert_eq!(renderer.requested.get(), 24);

    let xml = read_zip_entry(&output, "word/document.xml");
    assert_eq!(xml.matches("<w:drawing").count(), 20);
    assert_eq!(xml.matches("<w:tbl>").count(), 8);
    assert_eq!(std::fs::read_dir(staging.path()).expect("list").count(), 0);
}

/// Breaks one kind of comparison chart: `BucketShares` fails to draw, and
/// `ClassMeans` hands back an artifact whose image has already vanished.
struct BrokenComparisons {
    inner: Renderer,
    unreadable_means: bool,
}

impl ChartRenderer for BrokenComparisons {
    fn subject_chart(
        &self,
        kind: SubjectChart,
        input: &SubjectChartInput<'_>,
    ) -> Result<ChartArtifact, ChartError> {
        self.inner.subject_chart(kind, input)
    }

    fn comparison_chart(
        &self,
        kind: ComparisonChart,
        input: &ComparisonInput,
    ) -> Result<ChartArtifact, ChartError> {
        match kind {
            ComparisonChart::BucketShares if !self.unreadable_means => {
                Err(ChartError::Drawing("stacked bars unavailable".to_string()))
            }
            ComparisonChart::ClassMeans if self.unreadable_means => {
                let artifact = self.inner.comparison_chart(kind, input)?;
                std::fs::remove_file(artifact.path()).expect("remove chart image");
                Ok(artifact)
            }
            other => self.inner.comparison_chart(other, input),
        }
    }
}

fn report_with_broken_comparisons(unreadable_means: bool, prefix: &str) {
    let dir = temp_dir(prefix);
    let input = dir.path().join("scores.xlsx");
    write_two_class_fixture(&input);
    let staging = temp_dir(&format!("{}-charts", prefix));

    let config = staged_config(staging.path());
    let table = markreport::sheet::load_score_table(&input, &config).expect("load");
    let stats = aggregate(&table, &config.buckets, &config.thresholds);
    let renderer = BrokenComparisons {
        inner: Renderer::without_text(config.charts.clone()),
        unreadable_means,
    };
    let doc = build_report(&table, &stats, &renderer, "Report");

    assert_eq!(pictures(subsection(&doc, "Math class comparison")), 1);
    assert_eq!(pictures(subsection(&doc, "English class comparison")), 1);
    assert_eq!(pictures(subsection(&doc, "Math analysis")), 5);
    assert_eq!(doc.picture_count(), 4 * 5 + 2);
    assert_eq!(
        headings(&doc, 2).last().map(String::as_str),
        Some("English class comparison")
    );

    let output = dir.path().join("report.docx");
    doc.save(&output).expect("save");
    let xml = read_zip_entry(&output, "word/document.xml");
    assert_eq!(xml.matches("<w:drawing").count(), 22);
    assert_eq!(std::fs::read_dir(staging.path()).expect("list").count(), 0);
}

#[test]
fn failed_comparison_chart_keeps_the_other_one() {
    report_with_broken_comparisons(false, "markreport-nocmp");
}

#[test]
fn unreadable_comparison_chart_is_skipped_and_cleaned_up() {
    report_with_broken_comparisons(true, "markreport-gonecmp");
}

fn row(sheet_row: usize, class: &str, cells: Vec<Cell>) -> ScoreRow {
    ScoreRow {
        sheet_row,
        class_id: class.to_string(),
        cells,
    }
}

#[test]
fn class_without_scores_gets_placeholders_instead_of_charts() {
    let dir = temp_dir("markreport-empty-group");
    let config = staged_config(dir.path());
    let table = ScoreTable::new(
        vec!["Math".to_string(), "Art".to_string()],
        vec![
            row(2, "A", vec![Cell::Number(70.0), Cell::Missing]),
            row(3, "A", vec![Cell::Number(90.0), Cell::Missing]),
            row(4, "B", vec![Cell::Number(55.0), Cell::Number(81.0)]),
        ],
    );
    let stats = aggregate(&table, &config.buckets, &config.thresholds);
    let renderer = Renderer::without_text(config.charts.clone());
    let doc = build_report(&table, &stats, &renderer, "Report");

    let blocks = doc.blocks();
    let class_b = blocks
        .iter()
        .position(|b| matches!(b, Block::Heading { level: 1, text } if text == "Class B analysis"))
        .expect("class B heading");
    let art_a = &blocks[..class_b];
    let art_a = &art_a[art_a
        .iter()
        .position(|b| matches!(b, Block::Heading { level: 2, text } if text == "Art analysis"))
        .expect("Art heading for A")..];

    let t = tables(art_a);
    assert_eq!(t.len(), 2);
    assert_eq!(t[0][0][1], NOT_AVAILABLE);
    assert_eq!(t[0][1][1], "0.00%");
    assert_eq!(pictures(art_a), 0);
    assert!(art_a
        .iter()
        .any(|b| matches!(b, Block::Paragraph(p) if p == "No scores recorded; charts omitted.")));

    // class B still gets its Art charts, and the comparison still has both classes
    assert_eq!(pictures(subsection(&doc, "Art class comparison")), 2);
    assert_eq!(doc.picture_count(), 3 * 5 + 2 * 2);
    assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 0);
}

#[test]
fn non_numeric_subject_is_reported_in_place() {
    let dir = temp_dir("markreport-non-numeric");
    let config = staged_config(dir.path());
    let table = ScoreTable::new(
        vec!["Math".to_string(), "Music".to_string()],
        vec![
            row(2, "A", vec![Cell::Number(70.0), Cell::Invalid("absent".to_string())]),
            row(3, "B", vec![Cell::Number(65.0), Cell::Number(80.0)]),
        ],
    );
    let stats = aggregate(&table, &config.buckets, &config.thresholds);
    let renderer = Renderer::without_text(config.charts.clone());
    let doc = build_report(&table, &stats, &renderer, "Report");

    let notes: Vec<String> = paragraphs(&doc)
        .into_iter()
        .filter(|p| p.starts_with("Statistics unavailable:"))
        .collect();
    // one per class plus the comparison subsection
    assert_eq!(notes.len(), 3);
    assert!(notes.iter().all(|n| n.contains("'absent'") && n.contains("row 2")));
    assert_eq!(pictures(subsection(&doc, "Music class comparison")), 0);
    assert_eq!(pictures(subsection(&doc, "Math class comparison")), 2);
    assert_eq!(doc.picture_count(), 2 * 5 + 2);
}

#[test]
fn save_failure_keeps_statistics() {
    let dir = temp_dir("markreport-save-fail");
    let input = dir.path().join("scores.xlsx");
    write_two_class_fixture(&input);
    let config = staged_config(dir.path());
    let renderer = Renderer::without_text(config.charts.clone());

    let output = dir.path().join("missing").join("report.docx");
    let outcome = generate_report(&input, &output, &config, &renderer).expect("report");
    let err = outcome.saved.expect_err("save should fail");
    assert!(format!("{:#}", err).contains("output directory does not exist"));
    assert_eq!(outcome.statistics.classes.len(), 2);
    assert!(!output.exists());
}
