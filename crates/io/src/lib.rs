// Spreadsheet I/O: cell grids in, cell grids out.
//
// Format is chosen by file extension. Writes go through a temporary file in
// the target directory and are renamed into place, so a failed write never
// leaves a partial output behind.

pub mod csv;
pub mod error;
pub mod template;
pub mod xlsx;

use std::io::Write;
use std::path::Path;

use postfill_recon::config::SheetRef;
use postfill_recon::grid::Grid;

pub use error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Anything calamine opens: xlsx, xlsm, xls, xlsb, ods.
    Workbook,
    Csv,
    Tsv,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Workbook),
            "csv" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            _ => Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Read one sheet as a grid in absolute sheet coordinates.
///
/// CSV/TSV files have a single sheet; the selector is ignored for them.
pub fn read_grid(path: &Path, sheet: &SheetRef) -> Result<Grid, IoError> {
    let grid = match FileFormat::from_path(path)? {
        FileFormat::Workbook => xlsx::read_sheet(path, sheet)?,
        FileFormat::Csv => csv::read(path, None)?,
        FileFormat::Tsv => csv::read(path, Some(b'\t'))?,
    };
    tracing::info!(
        path = %path.display(),
        rows = grid.height(),
        cols = grid.width(),
        "read grid"
    );
    Ok(grid)
}

/// Write a grid to `path`, replacing any existing file only on success.
///
/// `.xlsx` gets a single worksheet named `sheet_name`; `.csv`/`.tsv` ignore
/// the name. Other workbook extensions are rejected since only xlsx can be
/// written.
pub fn write_grid(path: &Path, sheet_name: &str, grid: &Grid) -> Result<(), IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let bytes = match (FileFormat::from_path(path)?, ext.as_str()) {
        (FileFormat::Workbook, "xlsx") => xlsx::to_bytes(sheet_name, grid).map_err(|e| IoError::write(path, e))?,
        (FileFormat::Workbook, _) => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
        (FileFormat::Csv, _) => csv::to_bytes(grid, b',').map_err(|e| IoError::write(path, e))?,
        (FileFormat::Tsv, _) => csv::to_bytes(grid, b'\t').map_err(|e| IoError::write(path, e))?,
    };

    write_atomic(path, &bytes)?;
    tracing::info!(
        path = %path.display(),
        rows = grid.height(),
        bytes = bytes.len(),
        "wrote grid"
    );
    Ok(())
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Whether `write_filled_template` applies: both files must be `.xlsx`.
pub fn can_fill_in_place(template: &Path, output: &Path) -> bool {
    is_xlsx(template) && is_xlsx(output)
}

/// Write `grid` into a copy of the template workbook, replacing one
/// worksheet's cells and keeping everything else. Returns the name of the
/// filled sheet.
pub fn write_filled_template(template: &Path, sheet: &SheetRef, output: &Path, grid: &Grid) -> Result<String, IoError> {
    if !can_fill_in_place(template, output) {
        let path = if is_xlsx(template) { output } else { template };
        return Err(IoError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }
    let filled = template::fill(template, sheet, grid, output)?;
    write_atomic(output, &filled.bytes)?;
    tracing::info!(
        path = %output.display(),
        template = %template.display(),
        sheet = %filled.sheet,
        rows = grid.height(),
        "filled template"
    );
    Ok(filled.sheet)
}

/// Write to a temp file next to `path`, then rename over it. The temp file is
/// removed on any failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".postfill-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| IoError::write(path, e))?;
    tmp.write_all(bytes).map_err(|e| IoError::write(path, e))?;
    tmp.as_file().sync_all().map_err(|e| IoError::write(path, e))?;
    tmp.persist(path).map_err(|e| IoError::write(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_by_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.XLSX")).unwrap(), FileFormat::Workbook);
        assert_eq!(FileFormat::from_path(Path::new("a.ods")).unwrap(), FileFormat::Workbook);
        assert_eq!(FileFormat::from_path(Path::new("a.csv")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("a.tsv")).unwrap(), FileFormat::Tsv);
        assert!(matches!(
            FileFormat::from_path(Path::new("a.pdf")),
            Err(IoError::UnsupportedFormat { .. })
        ));
        assert!(FileFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn write_rejects_non_xlsx_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xls");
        let err = write_grid(&path, "Sheet1", &Grid::new()).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        // Only the target remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn atomic_write_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
        assert!(!path.exists());
    }
}
