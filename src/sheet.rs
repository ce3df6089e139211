use std::cmp::Ordering;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::config::ReportConfig;
use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Missing,
    /// Anything that is neither empty nor readable as a number.
    Invalid(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    /// 1-based row number in the worksheet, for diagnostics.
    pub sheet_row: usize,
    pub class_id: String,
    /// One cell per subject, in `ScoreTable::subjects` order.
    pub cells: Vec<Cell>,
}

/// Score sheet after header resolution. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    subjects: Vec<String>,
    rows: Vec<ScoreRow>,
}

impl ScoreTable {
    pub fn new(subjects: Vec<String>, rows: Vec<ScoreRow>) -> Self {
        Self { subjects, rows }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    /// Class identifiers in report order.
    pub fn class_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for r in &self.rows {
            if !ids.contains(&r.class_id) {
                ids.push(r.class_id.clone());
            }
        }
        ids.sort_by(|a, b| compare_class_ids(a, b));
        ids
    }

    pub fn class_rows<'a>(&'a self, class_id: &'a str) -> impl Iterator<Item = &'a ScoreRow> + 'a {
        self.rows.iter().filter(move |r| r.class_id == class_id)
    }

    /// Build a table from a header row and data rows of worksheet cells.
    pub fn from_range(range: &Range<Data>, cfg: &ReportConfig) -> Result<Self, LoadError> {
        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or(LoadError::MissingHeader)?
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect();
        if header.iter().all(|h| h.is_empty()) {
            return Err(LoadError::MissingHeader);
        }

        let class_col = cfg
            .class_column
            .iter()
            .find_map(|want| header.iter().position(|h| header_matches(h, want)))
            .ok_or_else(|| LoadError::MissingClassColumn {
                expected: cfg.class_column.join(", "),
            })?;

        let subject_cols: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(i, h)| {
                *i != class_col
                    && !h.is_empty()
                    && !cfg.identifier_columns.iter().any(|id| header_matches(h, id))
            })
            .map(|(i, _)| i)
            .collect();
        if subject_cols.is_empty() {
            return Err(LoadError::NoSubjects);
        }
        let subjects = subject_cols.iter().map(|&i| header[i].clone()).collect();

        let mut out = Vec::new();
        for (offset, row) in rows.enumerate() {
            // header is sheet row first_row + 1 (1-based)
            let sheet_row = first_row + offset + 2;
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let class_id = row.get(class_col).map(class_label).unwrap_or_default();
            if class_id.is_empty() {
                log::warn!("row {} has no class identifier; skipped", sheet_row);
                continue;
            }
            let cells = subject_cols
                .iter()
                .map(|&i| row.get(i).map(score_cell).unwrap_or(Cell::Missing))
                .collect();
            out.push(ScoreRow {
                sheet_row,
                class_id,
                cells,
            });
        }

        Ok(Self::new(subjects, out))
    }
}

/// Open the first worksheet of `path` and resolve it into a [`ScoreTable`].
pub fn load_score_table(path: &Path, cfg: &ReportConfig) -> Result<ScoreTable, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoWorksheet(path.to_path_buf()))?
        .map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let table = ScoreTable::from_range(&range, cfg)?;
    log::info!(
        "loaded {} rows, {} subjects from {}",
        table.rows().len(),
        table.subjects().len(),
        path.to_string_lossy()
    );
    Ok(table)
}

fn header_matches(header: &str, want: &str) -> bool {
    header.trim().to_lowercase() == want.trim().to_lowercase()
}

fn class_label(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn score_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Missing,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Cell::Missing
            } else {
                match t.parse::<f64>() {
                    Ok(v) if v.is_finite() => Cell::Number(v),
                    _ => Cell::Invalid(t.to_string()),
                }
            }
        }
        other => Cell::Invalid(other.to_string()),
    }
}

fn numeric_class_id(id: &str) -> Option<f64> {
    id.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Total order over class ids: finite numbers first by value, then text.
fn compare_class_ids(a: &str, b: &str) -> Ordering {
    match (numeric_class_id(a), numeric_class_id(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
