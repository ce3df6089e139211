#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Scratch directory removed when dropped, including on a failed assertion.
pub fn temp_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp dir")
}

pub enum Val<'a> {
    Num(f64),
    Text(&'a str),
    Empty,
}

fn column_name(idx: usize) -> String {
    let mut n = idx + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Write a one-sheet workbook with inline string cells.
pub fn write_xlsx(path: &Path, header: &[&str], rows: &[Vec<Val<'_>>]) {
    let mut sheet = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    let header_row: Vec<Val<'_>> = header.iter().map(|h| Val::Text(h)).collect();
    for (r, row) in std::iter::once(&header_row).chain(rows.iter()).enumerate() {
        sheet.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, v) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c), r + 1);
            match v {
                Val::Num(n) => sheet.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, n)),
                Val::Text(t) => sheet.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    cell_ref,
                    escape(t)
                )),
                Val::Empty => {}
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        (
            "[Content_Types].xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
</Types>"
                .to_string(),
        ),
        (
            "_rels/.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>"
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
<sheets><sheet name=\"Scores\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>"
                .to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
</Relationships>"
                .to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let file = File::create(path).expect("create xlsx");
    let mut zip = ZipWriter::new(file);
    let opts = FileOptions::default();
    for (name, body) in parts {
        zip.start_file(name, opts).expect("start xlsx part");
        zip.write_all(body.as_bytes()).expect("write xlsx part");
    }
    zip.finish().expect("finish xlsx");
}

pub const SUBJECTS: [&str; 2] = ["Math", "English"];

/// Two classes, two subjects, five students each.
pub fn write_two_class_fixture(path: &Path) {
    let students: [(&str, &str, f64, f64); 10] = [
        ("1", "Ann", 95.0, 58.0),
        ("1", "Ben", 82.0, 64.0),
        ("1", "Cai", 74.0, 71.0),
        ("1", "Dee", 66.0, 85.0),
        ("1", "Eli", 45.0, 92.0),
        ("2", "Fay", 100.0, 77.0),
        ("2", "Gus", 90.0, 79.5),
        ("2", "Hal", 89.5, 60.0),
        ("2", "Ivy", 61.0, 59.9),
        ("2", "Jon", 30.0, 88.0),
    ];
    let rows: Vec<Vec<Val<'_>>> = students
        .iter()
        .enumerate()
        .map(|(i, (class, name, math, english))| {
            vec![
                Val::Text(class),
                Val::Num((i + 1) as f64),
                Val::Text(name),
                Val::Num(*math),
                Val::Num(*english),
            ]
        })
        .collect();
    write_xlsx(path, &["class", "index", "name", "Math", "English"], &rows);
}

pub fn read_zip_entry(path: &Path, name: &str) -> String {
    let f = File::open(path).expect("open document");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut text = String::new();
    archive
        .by_name(name)
        .expect("zip entry")
        .read_to_string(&mut text)
        .expect("read zip entry");
    text
}

pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let f = File::open(path).expect("open document");
    let archive = zip::ZipArchive::new(f).expect("open zip archive");
    archive.file_names().map(|s| s.to_string()).collect()
}
