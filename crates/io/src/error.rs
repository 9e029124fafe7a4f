use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// File missing, unreadable, or not a workbook calamine understands.
    #[error("cannot open '{}': {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("'{}': sheet {sheet} not found (sheets: {available})", path.display())]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: String,
    },

    #[error("'{}': cannot read sheet '{sheet}': {message}", path.display())]
    ReadSheet {
        path: PathBuf,
        sheet: String,
        message: String,
    },

    #[error("'{}': unsupported file type (expected .xlsx, .xlsm, .xls, .xlsb, .ods, .csv or .tsv)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot write '{}': {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl IoError {
    pub(crate) fn open(path: &std::path::Path, e: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    pub(crate) fn write(path: &std::path::Path, e: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}
