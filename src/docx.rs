//! Report document model and its `.docx` rendering through `docx-rs`.
//!
//! The report builder fills a [`Document`] with [`Block`]s; only [`Document::save`]
//! and [`Document::write_to`] touch the word-processing library.

use anyhow::{anyhow, Context};
use docx_rs::{Docx, Paragraph, Pic, Run, Style, StyleType, Table, TableCell, TableRow};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

const EMU_PER_INCH: f64 = 914_400.0;
const TABLE_WIDTH_TWIPS: usize = 9000;

#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub width_inches: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Level 0 is the document title, 1..=3 map to Heading1..Heading3.
    Heading { level: u8, text: String },
    Paragraph(String),
    Table(Vec<Vec<String>>),
    Picture(Picture),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn add_heading(&mut self, text: impl Into<String>, level: u8) {
        self.blocks.push(Block::Heading {
            level: level.min(3),
            text: text.into(),
        });
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Paragraph(text.into()));
    }

    pub fn add_table(&mut self, rows: Vec<Vec<String>>) {
        self.blocks.push(Block::Table(rows));
    }

    pub fn add_picture(&mut self, picture: Picture) {
        self.blocks.push(Block::Picture(picture));
    }

    pub fn picture_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Picture(_)))
            .count()
    }

    pub fn save(&self, out_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(anyhow!(
                    "output directory does not exist: {}",
                    parent.to_string_lossy()
                ));
            }
        }
        let out_file = File::create(out_path).with_context(|| {
            format!(
                "failed to create output file {}",
                out_path.to_string_lossy()
            )
        })?;
        self.write_to(out_file)
            .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))
    }

    pub fn write_to<W: Write + Seek>(&self, out: W) -> anyhow::Result<()> {
        self.to_docx()
            .build()
            .pack(out)
            .map_err(|e| anyhow!("failed to package document: {}", e))
    }

    fn to_docx(&self) -> Docx {
        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let mut docx = Docx::new().created_at(&now).updated_at(&now);
        for style in heading_styles() {
            docx = docx.add_style(style);
        }
        for block in &self.blocks {
            docx = match block {
                Block::Heading { level, text } => {
                    docx.add_paragraph(text_paragraph(text).style(&heading_style_id(*level)))
                }
                Block::Paragraph(text) => docx.add_paragraph(text_paragraph(text)),
                Block::Table(rows) => docx.add_table(table(rows)),
                Block::Picture(pic) => docx.add_paragraph(picture_paragraph(pic)),
            };
        }
        docx
    }
}

fn heading_style_id(level: u8) -> String {
    match level {
        0 => "Title".to_string(),
        n => format!("Heading{}", n),
    }
}

/// Title and Heading1..Heading3, sizes in half-points.
fn heading_styles() -> Vec<Style> {
    [(0u8, "Title", 52usize), (1, "heading 1", 36), (2, "heading 2", 30), (3, "heading 3", 26)]
        .into_iter()
        .map(|(level, name, size)| {
            Style::new(&heading_style_id(level), StyleType::Paragraph)
                .name(name)
                .size(size)
                .bold()
        })
        .collect()
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn table(rows: &[Vec<String>]) -> Table {
    let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0).max(1);
    let rows = rows
        .iter()
        .map(|row| {
            TableRow::new(
                (0..cols)
                    .map(|c| {
                        let text = row.get(c).map(String::as_str).unwrap_or("");
                        TableCell::new().add_paragraph(text_paragraph(text))
                    })
                    .collect(),
            )
        })
        .collect();
    Table::new(rows).set_grid(vec![TABLE_WIDTH_TWIPS / cols; cols])
}

/// Inline picture scaled to `width_inches`, keeping the rendered aspect ratio.
fn picture_paragraph(pic: &Picture) -> Paragraph {
    let cx = (pic.width_inches * EMU_PER_INCH).round() as u32;
    let cy = if pic.width_px == 0 {
        cx
    } else {
        (cx as f64 * pic.height_px as f64 / pic.width_px as f64).round() as u32
    };
    let image = Pic::new_with_dimensions(pic.png.clone(), pic.width_px, pic.height_px).size(cx, cy);
    Paragraph::new().add_run(Run::new().add_image(image))
}
