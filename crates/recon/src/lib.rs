//! `postfill-recon`: postal manifest reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded cell grids, returns the populated
//! output grid and a run summary. No CLI or file IO dependencies.

pub mod address;
pub mod config;
pub mod dimensions;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod grid;
pub mod model;
pub mod normalize;
pub mod template;

pub use config::FillConfig;
pub use engine::generate_output;
pub use error::{ReconError, Source};
pub use grid::{CellValue, Grid};
pub use model::{CanonicalRecord, FillOutput, FillSummary, SourceGrids};
