//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts that wrap `postfill` rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 2    | Usage error (bad arguments; emitted by clap)              |
//! | 10   | Configuration error (unreadable, invalid, inconsistent)   |
//! | 11   | Input source error (file, sheet, header row, column)      |
//! | 12   | Output write failed (no output file was left behind)      |

use postfill_io::IoError;
use postfill_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable, malformed, or fails validation; tiered dimensions
/// selected without a volumetric source.
pub const EXIT_CONFIG: u8 = 10;

/// An input workbook could not be opened or lacks a required sheet, header
/// row or column.
pub const EXIT_INPUT: u8 = 11;

/// The output file could not be written.
pub const EXIT_OUTPUT: u8 = 12;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::DimensionSourceRequired => EXIT_CONFIG,
        ReconError::MissingHeaderRow { .. }
        | ReconError::MissingColumn { .. }
        | ReconError::EmptyDimensionBlock { .. } => EXIT_INPUT,
    }
}

/// Map an I/O error to its exit code. Only a failed write is an output
/// error; everything else concerns an input.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Write { .. } => EXIT_OUTPUT,
        IoError::Open { .. }
        | IoError::SheetNotFound { .. }
        | IoError::ReadSheet { .. }
        | IoError::UnsupportedFormat { .. } => EXIT_INPUT,
    }
}
