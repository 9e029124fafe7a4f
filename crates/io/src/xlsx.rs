// Excel import (calamine) and export (rust_xlsxwriter)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Workbook, XlsxError};

use postfill_recon::config::SheetRef;
use postfill_recon::grid::{CellValue, Grid};

use crate::error::IoError;

/// Read one worksheet from any workbook calamine can open (xlsx, xlsm, xls,
/// xlsb, ods).
///
/// Cells keep their absolute position: a used range starting at C4 still
/// puts that cell at row 3, column 2.
pub fn read_sheet(path: &Path, sheet: &SheetRef) -> Result<Grid, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::open(path, e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let name = resolve_sheet(&sheet_names, sheet).ok_or_else(|| IoError::SheetNotFound {
        path: path.to_path_buf(),
        sheet: sheet.to_string(),
        available: sheet_names.join(", "),
    })?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IoError::ReadSheet {
            path: path.to_path_buf(),
            sheet: name.clone(),
            message: e.to_string(),
        })?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut grid = Grid::new();
    for (row_idx, row) in range.rows().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let value = convert(cell);
            if value != CellValue::Empty {
                grid.set(start_row as usize + row_idx, start_col as usize + col_idx, value);
            }
        }
    }

    tracing::debug!(sheet = %name, rows = grid.height(), "worksheet loaded");
    Ok(grid)
}

/// Pick a sheet by index, exact name, or case-insensitive trimmed name.
pub(crate) fn resolve_sheet(names: &[String], sheet: &SheetRef) -> Option<String> {
    match sheet {
        SheetRef::Index(i) => names.get(*i).cloned(),
        SheetRef::Name(wanted) => names
            .iter()
            .find(|n| *n == wanted)
            .or_else(|| {
                let wanted = wanted.trim().to_lowercase();
                names.iter().find(|n| n.trim().to_lowercase() == wanted)
            })
            .cloned(),
    }
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Dates stay serial numbers; nothing downstream reads them as dates
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

/// Serialize a grid as a single-sheet xlsx workbook.
///
/// The document creation time is pinned, so the same grid always produces
/// the same bytes.
pub fn to_bytes(sheet_name: &str, grid: &Grid) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    let properties = DocProperties::new().set_creation_datetime(&created);
    workbook.set_properties(&properties);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (row_idx, row) in grid.rows().enumerate() {
        let r = row_idx as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let c = col_idx as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}
