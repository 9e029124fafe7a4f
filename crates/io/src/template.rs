//! Fill an `.xlsx` template in place.
//!
//! The filled grid replaces the cell data of one worksheet in a copy of the
//! template package. Every other part (styles, column widths, other sheets,
//! print setup, shared strings) is copied unchanged. Cells keep the style
//! they had in the template; data rows past the template take the style of
//! the template's first data row.

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use postfill_recon::config::SheetRef;
use postfill_recon::grid::{CellValue, Grid};

use crate::error::IoError;
use crate::xlsx::resolve_sheet;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES: &str = "[Content_Types].xml";
const CALC_CHAIN: &str = "xl/calcChain.xml";

/// 0-based row whose styles carry down to every data row.
const FIRST_DATA_ROW: usize = 2;

/// A filled copy of the template package.
#[derive(Debug)]
pub struct FilledWorkbook {
    /// Name of the worksheet that received the grid.
    pub sheet: String,
    pub bytes: Vec<u8>,
}

/// Build the filled workbook. Read failures name `template`, packaging
/// failures name `output`.
pub fn fill(template: &Path, sheet: &SheetRef, grid: &Grid, output: &Path) -> Result<FilledWorkbook, IoError> {
    let file = std::fs::File::open(template).map_err(|e| IoError::open(template, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| IoError::open(template, e))?;

    let workbook_xml = read_zip_file(&mut archive, WORKBOOK).map_err(|e| IoError::open(template, e))?;
    let rels_xml = read_zip_file(&mut archive, WORKBOOK_RELS).map_err(|e| IoError::open(template, e))?;
    let parts = worksheet_parts(&workbook_xml, &rels_xml);

    let names: Vec<String> = parts.iter().map(|(name, _)| name.clone()).collect();
    let name = resolve_sheet(&names, sheet).ok_or_else(|| IoError::SheetNotFound {
        path: template.to_path_buf(),
        sheet: sheet.to_string(),
        available: names.join(", "),
    })?;
    let read_error = |message: String| IoError::ReadSheet {
        path: template.to_path_buf(),
        sheet: name.clone(),
        message,
    };
    let part = parts
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| p.clone())
        .ok_or_else(|| read_error("worksheet part not listed".into()))?;

    let sheet_xml = read_zip_file(&mut archive, &part).map_err(read_error)?;
    let layout = TemplateLayout::parse(&sheet_xml).map_err(|e| read_error(e.to_string()))?;
    let filled_xml = rewrite_sheet(&sheet_xml, grid, &layout).map_err(|e| read_error(e.to_string()))?;

    let has_calc_chain = archive.index_for_name(CALC_CHAIN).is_some();
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| IoError::open(template, e))?;
        let entry_name = entry.name().to_owned();

        let replacement = if entry_name == part {
            Some(filled_xml.clone())
        } else if entry_name == CALC_CHAIN {
            // Lists formula cells of the old sheet data
            continue;
        } else if has_calc_chain && (entry_name == CONTENT_TYPES || entry_name == WORKBOOK_RELS) {
            let mut xml = String::new();
            entry.read_to_string(&mut xml).map_err(|e| IoError::open(template, e))?;
            Some(drop_calc_chain_refs(&xml).map_err(|e| IoError::open(template, e))?)
        } else {
            None
        };

        match replacement {
            Some(bytes) => {
                writer
                    .start_file(entry_name, options)
                    .map_err(|e| IoError::write(output, e))?;
                writer.write_all(&bytes).map_err(|e| IoError::write(output, e))?;
            }
            None => writer.raw_copy_file(entry).map_err(|e| IoError::write(output, e))?,
        }
    }

    let bytes = writer.finish().map_err(|e| IoError::write(output, e))?.into_inner();
    tracing::debug!(sheet = %name, part = %part, "filled template worksheet");
    Ok(FilledWorkbook { sheet: name, bytes })
}

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("'{}' not found in workbook: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Worksheet names in workbook order, each with its package part path.
fn worksheet_parts(workbook_xml: &str, rels_xml: &str) -> Vec<(String, String)> {
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"sheet" => {
                let name = attr_value(e, b"name");
                let rid = attr_value(e, b"r:id");
                if let (Some(name), Some(rid)) = (name, rid) {
                    sheets.push((name, rid));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(e, b"Id"), attr_value(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    sheets
        .into_iter()
        .filter_map(|(name, rid)| {
            let target = targets.get(&rid)?;
            let part = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{}", target),
            };
            Some((name, part))
        })
        .collect()
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.decode_and_unescape_value(e.decoder()).ok().map(|v| v.into_owned()))
}

// ---------------------------------------------------------------------------
// Worksheet rewrite
// ---------------------------------------------------------------------------

/// Row attributes and cell styles of the template worksheet.
#[derive(Debug, Default)]
struct TemplateLayout {
    /// `<row>` attributes other than `r` and `spans`, by 0-based row.
    rows: HashMap<usize, Vec<(String, String)>>,
    /// Style index (`s`) by (row, col).
    styles: HashMap<(usize, usize), String>,
}

impl TemplateLayout {
    fn parse(xml: &str) -> quick_xml::Result<Self> {
        let mut layout = Self::default();
        let mut reader = Reader::from_str(xml);
        let mut row: Option<usize> = None;
        let mut col = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"row" => {
                    let r = attr_value(e, b"r")
                        .and_then(|v| v.parse::<usize>().ok())
                        .and_then(|r| r.checked_sub(1))
                        .unwrap_or_else(|| row.map_or(0, |prev| prev + 1));
                    let attrs = e
                        .attributes()
                        .flatten()
                        .filter(|a| !matches!(a.key.as_ref(), b"r" | b"spans"))
                        .filter_map(|a| {
                            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                            a.decode_and_unescape_value(e.decoder()).ok().map(|v| (key, v.into_owned()))
                        })
                        .collect();
                    layout.rows.insert(r, attrs);
                    row = Some(r);
                    col = 0;
                }
                Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"c" => {
                    let (r, c) = attr_value(e, b"r")
                        .and_then(|v| parse_cell_ref(&v))
                        .unwrap_or((row.unwrap_or(0), col));
                    if let Some(style) = attr_value(e, b"s") {
                        layout.styles.insert((r, c), style);
                    }
                    col = c + 1;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(layout)
    }

    fn style(&self, row: usize, col: usize) -> Option<&str> {
        self.styles
            .get(&(row, col))
            .or_else(|| {
                if row > FIRST_DATA_ROW {
                    self.styles.get(&(FIRST_DATA_ROW, col))
                } else {
                    None
                }
            })
            .map(String::as_str)
    }
}

/// Replace `<sheetData>` with the grid and update `<dimension>`; every other
/// element passes through untouched.
fn rewrite_sheet(xml: &str, grid: &Grid, layout: &TemplateLayout) -> quick_xml::Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut skipping = false;

    loop {
        let event = reader.read_event()?;
        if skipping {
            match event {
                Event::End(ref e) if e.name().as_ref() == b"sheetData" => {
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                    skipping = false;
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(e) if e.name().as_ref() == b"sheetData" => {
                writer.write_event(Event::Start(e))?;
                write_rows(&mut writer, grid, layout)?;
                skipping = true;
            }
            Event::Empty(e) if e.name().as_ref() == b"sheetData" => {
                writer.write_event(Event::Start(e))?;
                write_rows(&mut writer, grid, layout)?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"dimension" => {
                let mut dimension = BytesStart::new("dimension");
                dimension.push_attribute(("ref", used_range(grid).as_str()));
                writer.write_event(Event::Empty(dimension))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    Ok(writer.into_inner())
}

fn write_rows<W: Write>(writer: &mut Writer<W>, grid: &Grid, layout: &TemplateLayout) -> quick_xml::Result<()> {
    for (r, row) in grid.rows().enumerate() {
        let mut cols: BTreeSet<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_blank())
            .map(|(c, _)| c)
            .collect();
        cols.extend(layout.styles.keys().filter(|(sr, _)| *sr == r).map(|(_, c)| *c));
        if cols.is_empty() && !layout.rows.contains_key(&r) {
            continue;
        }

        let mut row_el = BytesStart::new("row");
        row_el.push_attribute(("r", (r + 1).to_string().as_str()));
        for (key, value) in layout.rows.get(&r).into_iter().flatten() {
            row_el.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(row_el))?;
        for c in cols {
            write_cell(writer, r, c, grid.get(r, c), layout.style(r, c))?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    Ok(())
}

fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    row: usize,
    col: usize,
    value: &CellValue,
    style: Option<&str>,
) -> quick_xml::Result<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", cell_ref(row, col).as_str()));
    if let Some(style) = style {
        cell.push_attribute(("s", style));
    }

    let (inline, text) = match value {
        CellValue::Empty => {
            writer.write_event(Event::Empty(cell))?;
            return Ok(());
        }
        CellValue::Text(s) => {
            cell.push_attribute(("t", "inlineStr"));
            (true, s.clone())
        }
        CellValue::Number(n) => (false, n.to_string()),
        CellValue::Bool(b) => {
            cell.push_attribute(("t", "b"));
            (false, if *b { "1" } else { "0" }.to_string())
        }
    };

    writer.write_event(Event::Start(cell))?;
    if inline {
        writer.write_event(Event::Start(BytesStart::new("is")))?;
        let mut t = BytesStart::new("t");
        t.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(t))?;
        writer.write_event(Event::Text(BytesText::new(&text)))?;
        writer.write_event(Event::End(BytesEnd::new("t")))?;
        writer.write_event(Event::End(BytesEnd::new("is")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("v")))?;
        writer.write_event(Event::Text(BytesText::new(&text)))?;
        writer.write_event(Event::End(BytesEnd::new("v")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Remove `[Content_Types].xml` overrides and workbook relationships that
/// point at the calculation chain.
fn drop_calc_chain_refs(xml: &str) -> quick_xml::Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event()? {
            Event::Empty(ref e)
                if e
                    .attributes()
                    .flatten()
                    .any(|a| a.value.ends_with(b"calcChain.xml")) => {}
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    Ok(writer.into_inner())
}

fn column_name(col: usize) -> String {
    let mut name = String::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    name
}

fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_name(col), row + 1)
}

/// "C4" -> (3, 2)
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let col = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    let row: usize = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

fn used_range(grid: &Grid) -> String {
    if grid.height() == 0 || grid.width() == 0 {
        return "A1".to_string();
    }
    format!("A1:{}", cell_ref(grid.height() - 1, grid.width() - 1))
}
