//! Package dimension lookup.
//!
//! Two policies answer the same question, "what box does this parcel go
//! in?": a category-aware volumetric table and a quantity threshold rule.
//! Both sit behind [`DimensionResolver`]; the config picks one.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{BlockConfig, BlockLayout, DimensionConfig, DimensionPolicy, ThresholdConfig};
use crate::error::ReconError;
use crate::grid::Grid;

/// Box size in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub length: u32,
    pub breadth: u32,
    pub height: u32,
}

impl From<[u32; 3]> for Dimensions {
    fn from([length, breadth, height]: [u32; 3]) -> Self {
        Self {
            length,
            breadth,
            height,
        }
    }
}

/// Resolve a parcel's box. `None` means "no dimensions available"; callers
/// write empty cells rather than inventing a size.
pub trait DimensionResolver {
    fn resolve(&self, category: Option<&str>, quantity: u32) -> Option<Dimensions>;
}

// ---------------------------------------------------------------------------
// Threshold policy
// ---------------------------------------------------------------------------

/// Quantity-only rule. Never fails.
#[derive(Debug, Clone)]
pub struct ThresholdDimensions {
    min_quantity: u32,
    large: Dimensions,
    small: Dimensions,
}

impl ThresholdDimensions {
    pub fn new(config: &ThresholdConfig) -> Self {
        Self {
            min_quantity: config.min_quantity,
            large: config.large.into(),
            small: config.small.into(),
        }
    }
}

impl Default for ThresholdDimensions {
    fn default() -> Self {
        Self::new(&ThresholdConfig::default())
    }
}

impl DimensionResolver for ThresholdDimensions {
    fn resolve(&self, _category: Option<&str>, quantity: u32) -> Option<Dimensions> {
        if quantity >= self.min_quantity {
            Some(self.large)
        } else {
            Some(self.small)
        }
    }
}

// ---------------------------------------------------------------------------
// Tiered policy
// ---------------------------------------------------------------------------

/// The product families the volumetric workbook has tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageClass {
    Calendar,
    TableCalendar,
    BigDiary,
    SmallDiary,
}

impl PackageClass {
    /// Classify a free-text category. "calendar" wins unless "table" is also
    /// present; then "table", "big", "small" in that order.
    pub fn classify(category: &str) -> Option<Self> {
        let c = category.to_lowercase();
        if c.contains("calendar") && !c.contains("table") {
            Some(Self::Calendar)
        } else if c.contains("table") {
            Some(Self::TableCalendar)
        } else if c.contains("big") {
            Some(Self::BigDiary)
        } else if c.contains("small") {
            Some(Self::SmallDiary)
        } else {
            None
        }
    }
}

impl std::fmt::Display for PackageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calendar => write!(f, "calendar"),
            Self::TableCalendar => write!(f, "table_calendar"),
            Self::BigDiary => write!(f, "big_diary"),
            Self::SmallDiary => write!(f, "small_diary"),
        }
    }
}

/// Category → (quantity → box). Quantities are looked up by floor.
#[derive(Debug, Clone, Default)]
pub struct TieredDimensions {
    tables: BTreeMap<PackageClass, BTreeMap<u32, Dimensions>>,
}

impl TieredDimensions {
    pub fn from_tables(tables: BTreeMap<PackageClass, BTreeMap<u32, Dimensions>>) -> Self {
        Self { tables }
    }

    /// Read the four quantity blocks out of the volumetric sheet.
    pub fn from_grid(grid: &Grid, layout: &BlockLayout) -> Result<Self, ReconError> {
        let blocks = [
            (PackageClass::Calendar, &layout.calendar),
            (PackageClass::TableCalendar, &layout.table_calendar),
            (PackageClass::BigDiary, &layout.big_diary),
            (PackageClass::SmallDiary, &layout.small_diary),
        ];

        let mut tables = BTreeMap::new();
        for (class, block) in blocks {
            let table = read_block(grid, block);
            if table.is_empty() {
                return Err(ReconError::EmptyDimensionBlock {
                    block: class.to_string(),
                });
            }
            tracing::debug!(block = %class, rows = table.len(), "loaded dimension block");
            tables.insert(class, table);
        }

        Ok(Self { tables })
    }

    pub fn table(&self, class: PackageClass) -> Option<&BTreeMap<u32, Dimensions>> {
        self.tables.get(&class)
    }
}

/// Rows whose quantity cell is not numeric are skipped; missing L/B/H
/// cells read as 0.
fn read_block(grid: &Grid, block: &BlockConfig) -> BTreeMap<u32, Dimensions> {
    let mut table = BTreeMap::new();
    for row in block.first_row..block.end_row {
        let Some(quantity) = grid.get(row, block.first_col).as_number() else {
            continue;
        };
        if quantity < 0.0 {
            continue;
        }
        let side = |offset: usize| {
            grid.get(row, block.first_col + offset)
                .as_number()
                .map(|n| n.max(0.0).trunc() as u32)
                .unwrap_or(0)
        };
        table.insert(
            quantity.trunc() as u32,
            Dimensions {
                length: side(1),
                breadth: side(2),
                height: side(3),
            },
        );
    }
    table
}

impl DimensionResolver for TieredDimensions {
    fn resolve(&self, category: Option<&str>, quantity: u32) -> Option<Dimensions> {
        let class = PackageClass::classify(category?)?;
        let table = self.tables.get(&class)?;
        // Exact hit, else the greatest tabulated quantity below the request
        table.range(..=quantity).next_back().map(|(_, dims)| *dims)
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Build the resolver the config asks for. Tiered mode needs the
/// volumetric grid.
pub fn build_resolver(
    config: &DimensionConfig,
    volumetric: Option<&Grid>,
) -> Result<Box<dyn DimensionResolver>, ReconError> {
    match config.policy {
        DimensionPolicy::Threshold => Ok(Box::new(ThresholdDimensions::new(&config.threshold))),
        DimensionPolicy::Tiered => {
            let grid = volumetric.ok_or(ReconError::DimensionSourceRequired)?;
            Ok(Box::new(TieredDimensions::from_grid(grid, &config.blocks)?))
        }
    }
}
