// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use postfill_recon::grid::{CellValue, Grid};

use crate::error::IoError;

/// Read a delimited file into an all-text grid. With no delimiter given the
/// delimiter is sniffed from the first lines.
///
/// Every row is kept, blank ones included, so row offsets match what a
/// spreadsheet shows.
pub fn read(path: &Path, delimiter: Option<u8>) -> Result<Grid, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    parse(&content, delimiter).map_err(|e| IoError::open(path, e))
}

fn parse(content: &str, delimiter: u8) -> Result<Grid, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    let mut record = csv::StringRecord::new();
    loop {
        let at = reader.position().byte() as usize;
        if !reader.read_record(&mut record)? {
            break;
        }
        // The reader skips empty lines; put them back as empty rows
        for _ in 0..skipped_blank_lines(content.as_bytes(), at, grid.height() > 0) {
            grid.push_row(Vec::new());
        }
        grid.push_row(record.iter().map(CellValue::from).collect());
    }
    Ok(grid)
}

/// Empty lines in the run of line breaks around byte `at`. After the first
/// record the run also holds that record's own terminator.
fn skipped_blank_lines(bytes: &[u8], at: usize, after_record: bool) -> usize {
    let is_break = |b: &u8| matches!(b, b'\r' | b'\n');
    let at = at.min(bytes.len());
    let begin = bytes[..at].iter().rposition(|b| !is_break(b)).map_or(0, |i| i + 1);
    let end = bytes[at..].iter().position(|b| !is_break(b)).map_or(bytes.len(), |i| at + i);

    let run = &bytes[begin..end];
    let mut breaks: usize = 0;
    let mut i = 0;
    while i < run.len() {
        i += if run[i] == b'\r' && run.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
        breaks += 1;
    }
    if after_record {
        breaks.saturating_sub(1)
    } else {
        breaks
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Score by how many sampled lines agree with the widest split; a
        // manifest's title rows are single-field, so line 1 alone is not enough
        let target = counts.iter().copied().max().unwrap_or(0);
        if target <= 1 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::open(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::open(path, e))?;

    match String::from_utf8(bytes) {
        // Byte offsets are taken against the text, so drop the BOM here
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_owned).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            tracing::debug!(path = %path.display(), "not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Serialize a grid. Trailing empty cells are trimmed per row; blank rows
/// are kept so data stays on the same row numbers.
pub fn to_bytes(grid: &Grid, delimiter: u8) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    for row in grid.rows() {
        let used = row.iter().rposition(|c| !c.is_blank()).map_or(0, |i| i + 1);
        let record: Vec<String> = row[..used].iter().map(CellValue::as_text).collect();
        if record.is_empty() {
            writer.write_record([""])?;
        } else {
            writer.write_record(&record)?;
        }
    }

    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}
