use std::fmt;

use thiserror::Error;

/// Which input a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Orders,
    Postal,
    Template,
    Dimensions,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orders => write!(f, "orders"),
            Self::Postal => write!(f, "postal"),
            Self::Template => write!(f, "template"),
            Self::Dimensions => write!(f, "dimensions"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (bad bounds, wrong sender line count, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Tiered dimensions selected but no volumetric grid was supplied.
    #[error("dimension policy 'tiered' requires a volumetric source")]
    DimensionSourceRequired,

    /// The source grid has no row at the configured header offset.
    #[error("{input}: header row {row} not found (sheet has {height} rows)")]
    MissingHeaderRow {
        input: Source,
        row: usize,
        height: usize,
    },

    /// A named column required by the pipeline is absent from the header row.
    #[error("{input}: missing column '{column}'")]
    MissingColumn { input: Source, column: String },

    /// A volumetric block produced no usable quantity rows.
    #[error("dimensions: block '{block}' has no quantity rows")]
    EmptyDimensionBlock { block: String },
}
