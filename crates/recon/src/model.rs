use std::collections::HashMap;

use serde::Serialize;

use crate::grid::{CellValue, Grid};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded source sheets for one run.
pub struct SourceGrids {
    pub orders: Grid,
    pub postal: Grid,
    pub template: Grid,
    /// Volumetric workbook; only read by the tiered dimension policy.
    pub dimensions: Option<Grid>,
}

/// One shipment, normalized from a postal manifest row and enriched by the
/// order join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub tracking_key: String,
    pub receiver_name: String,
    pub full_address: String,
    pub receiver_city: String,
    pub receiver_pincode: i64,
    pub receiver_mobile: String,
    pub quantity: u32,
    pub physical_weight_grams: u32,
    pub barcode: String,
    pub category: Option<String>,
    /// Empty until the join fills it.
    pub state: String,
}

/// Fields taken from the first order row seen for a booking number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderEntry {
    pub state: String,
    pub address: String,
    pub category: Option<String>,
}

/// Booking number → order fields, first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct OrderIndex {
    entries: HashMap<String, OrderEntry>,
    duplicates: usize,
}

impl OrderIndex {
    /// Insert unless the key is already present. Returns whether it was kept.
    pub fn insert_first(&mut self, key: String, entry: OrderEntry) -> bool {
        if self.entries.contains_key(&key) {
            self.duplicates += 1;
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn get(&self, key: &str) -> Option<&OrderEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Order rows ignored because their booking number was already indexed.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Output layout read from the template: labels (row 1) and defaults (row 2).
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSchema {
    pub labels: Vec<CellValue>,
    pub defaults: Vec<CellValue>,
}

impl TemplateSchema {
    pub fn from_grid(grid: &Grid) -> Self {
        let width = grid.row(0).len();
        let labels = grid.row(0).to_vec();
        let defaults = (0..width).map(|col| grid.get(1, col).clone()).collect();
        Self { labels, defaults }
    }

    pub fn width(&self) -> usize {
        self.labels.len()
    }

    /// Lowercased, trimmed label text used for marker matching.
    pub fn label_key(&self, col: usize) -> String {
        self.labels
            .get(col)
            .map(|c| c.as_text().trim().to_lowercase())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Counts describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillSummary {
    pub postal_rows: usize,
    pub excluded_pincode: usize,
    pub order_rows: usize,
    pub duplicate_orders: usize,
    pub records: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub dimensions_unavailable: usize,
    /// SHA-256 of the output grid; identical inputs give identical values.
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct FillOutput {
    /// Template labels, template defaults, then one row per record.
    pub grid: Grid,
    pub record_count: usize,
    pub summary: FillSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_index_counts_duplicates() {
        let mut index = OrderIndex::default();
        assert!(index.is_empty());
        assert!(index.insert_first("A".into(), OrderEntry::default()));
        assert!(!index.insert_first("A".into(), OrderEntry { state: "Goa".into(), ..OrderEntry::default() }));
        assert_eq!(index.len(), 1);
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.get("A").unwrap().state, "");
    }

    #[test]
    fn template_defaults_padded_to_label_width() {
        let grid = Grid::from_rows(vec![
            vec![CellValue::text(" Serial No "), CellValue::text("Service")],
            vec![CellValue::number(1)],
        ]);
        let schema = TemplateSchema::from_grid(&grid);
        assert_eq!(schema.width(), 2);
        assert_eq!(schema.defaults, vec![CellValue::number(1), CellValue::Empty]);
        assert_eq!(schema.label_key(0), "serial no");
        assert_eq!(schema.label_key(9), "");
    }

    #[test]
    fn summary_serializes_flat() {
        let summary = FillSummary {
            records: 2,
            fingerprint: "ab".into(),
            ..FillSummary::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["records"], 2);
        assert_eq!(json["excluded_pincode"], 0);
        assert_eq!(json["fingerprint"], "ab");
    }
}
