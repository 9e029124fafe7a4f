use crate::config::{FillConfig, OrdersConfig, PostalConfig};
use crate::dimensions::build_resolver;
use crate::error::{ReconError, Source};
use crate::evidence::fingerprint_grid;
use crate::grid::{CellValue, Grid, EMPTY_CELL};
use crate::model::{
    CanonicalRecord, FillOutput, FillSummary, OrderEntry, OrderIndex, SourceGrids, TemplateSchema,
};
use crate::normalize::{
    normalize_mobile, normalize_pincode, normalize_quantity, normalize_text, normalize_weight,
};
use crate::template::Projector;

/// Run the whole pipeline over pre-loaded grids: normalize postal rows,
/// drop out-of-range pincodes, join against orders, project onto the
/// template.
pub fn generate_output(config: &FillConfig, sources: &SourceGrids) -> Result<FillOutput, ReconError> {
    // Fail on configuration and source shape before doing any work
    let resolver = build_resolver(&config.dimensions, sources.dimensions.as_ref())?;
    if sources.template.height() == 0 {
        return Err(ReconError::MissingHeaderRow {
            input: Source::Template,
            row: 0,
            height: 0,
        });
    }
    let schema = TemplateSchema::from_grid(&sources.template);

    let postal = load_postal_records(&sources.postal, &config.postal)?;
    let postal_rows = postal.len();

    let (mut records, excluded_pincode) = filter_pincodes(postal, config);
    tracing::info!(
        rows = postal_rows,
        kept = records.len(),
        excluded = excluded_pincode,
        "postal manifest normalized"
    );

    let (index, order_rows) = load_order_index(&sources.orders, &config.orders)?;
    tracing::info!(
        rows = order_rows,
        unique = index.len(),
        duplicates = index.duplicates(),
        "order index built"
    );

    let matched = reconcile(&mut records, &index, &config.default_state);
    let unmatched = records.len() - matched;
    tracing::info!(matched, unmatched, "orders joined");

    let projector = Projector::new(&schema, &config.sender, &config.address, resolver.as_ref());
    let projection = projector.project(&records);
    tracing::info!(
        records = records.len(),
        columns = schema.width(),
        dimensions_unavailable = projection.dimensions_unavailable,
        "template projected"
    );

    let summary = FillSummary {
        postal_rows,
        excluded_pincode,
        order_rows,
        duplicate_orders: index.duplicates(),
        records: records.len(),
        matched,
        unmatched,
        dimensions_unavailable: projection.dimensions_unavailable,
        fingerprint: fingerprint_grid(&projection.grid),
    };

    Ok(FillOutput {
        grid: projection.grid,
        record_count: records.len(),
        summary,
    })
}

// ---------------------------------------------------------------------------
// Postal manifest
// ---------------------------------------------------------------------------

/// Normalize every postal data row (the rows after `header_row`) into a
/// record. Fully blank rows are skipped. No filtering happens here.
pub fn load_postal_records(grid: &Grid, config: &PostalConfig) -> Result<Vec<CanonicalRecord>, ReconError> {
    if grid.height() <= config.header_row {
        return Err(ReconError::MissingHeaderRow {
            input: Source::Postal,
            row: config.header_row,
            height: grid.height(),
        });
    }

    let col = &config.columns;
    let records = grid
        .rows()
        .skip(config.header_row + 1)
        .filter(|row| !row.iter().all(CellValue::is_blank))
        .map(|row| {
            let cell = |i: usize| row.get(i).unwrap_or(EMPTY_CELL);
            CanonicalRecord {
                tracking_key: normalize_text(cell(col.tracking)),
                receiver_name: normalize_text(cell(col.name)),
                full_address: normalize_text(cell(col.address)),
                receiver_city: normalize_text(cell(col.city)),
                receiver_pincode: normalize_pincode(cell(col.pincode)),
                receiver_mobile: normalize_mobile(cell(col.mobile)),
                quantity: normalize_quantity(cell(col.quantity)),
                physical_weight_grams: normalize_weight(cell(col.weight)),
                barcode: normalize_text(cell(col.barcode)),
                category: None,
                state: String::new(),
            }
        })
        .collect();

    Ok(records)
}

/// Split off records whose pincode is out of range. Exclusion is silent:
/// the count is reported, the records are gone.
pub fn filter_pincodes(records: Vec<CanonicalRecord>, config: &FillConfig) -> (Vec<CanonicalRecord>, usize) {
    let total = records.len();
    let kept: Vec<CanonicalRecord> = records
        .into_iter()
        .filter(|r| {
            let keep = config.pincode.contains(r.receiver_pincode);
            if !keep {
                tracing::debug!(
                    tracking_key = %r.tracking_key,
                    pincode = r.receiver_pincode,
                    "excluded: pincode out of range"
                );
            }
            keep
        })
        .collect();
    let excluded = total - kept.len();
    (kept, excluded)
}

// ---------------------------------------------------------------------------
// Orders report
// ---------------------------------------------------------------------------

/// Build the order index from the orders sheet. Returns the index and the
/// number of non-blank order rows read.
pub fn load_order_index(grid: &Grid, config: &OrdersConfig) -> Result<(OrderIndex, usize), ReconError> {
    if grid.height() <= config.header_row {
        return Err(ReconError::MissingHeaderRow {
            input: Source::Orders,
            row: config.header_row,
            height: grid.height(),
        });
    }

    let headers: Vec<String> = grid
        .row(config.header_row)
        .iter()
        .map(|c| c.as_text().trim().to_string())
        .collect();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        position(name).ok_or_else(|| ReconError::MissingColumn {
            input: Source::Orders,
            column: name.into(),
        })
    };

    let booking_idx = required(&config.booking_column)?;
    let state_idx = required(&config.state_column)?;
    let address_idx = position(&config.address_column);
    let category_idx = position(&config.category_column);

    let mut index = OrderIndex::default();
    let mut rows = 0;
    for row in grid.rows().skip(config.header_row + 1) {
        if row.iter().all(CellValue::is_blank) {
            continue;
        }
        rows += 1;

        let text = |i: usize| row.get(i).map(normalize_text).unwrap_or_default();
        let key = text(booking_idx);
        if key.is_empty() {
            continue;
        }

        let entry = OrderEntry {
            state: text(state_idx),
            address: address_idx.map(text).unwrap_or_default(),
            category: category_idx.map(text).filter(|c| !c.is_empty()),
        };
        if !index.insert_first(key.clone(), entry) {
            tracing::debug!(booking = %key, "duplicate booking number ignored");
        }
    }

    Ok((index, rows))
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Left join records against the order index, in place and in order.
///
/// On a hit the order's state is used (blank falls back to the default),
/// the order's address fills an empty record address and the order's
/// category is attached. On a miss the record keeps its address and gets the
/// default state. Returns the number of hits.
pub fn reconcile(records: &mut [CanonicalRecord], index: &OrderIndex, default_state: &str) -> usize {
    let mut matched = 0;
    for record in records.iter_mut() {
        match index.get(&record.tracking_key) {
            Some(order) => {
                matched += 1;
                record.state = if order.state.is_empty() {
                    default_state.to_string()
                } else {
                    order.state.clone()
                };
                if record.full_address.is_empty() {
                    record.full_address = order.address.clone();
                }
                record.category = order.category.clone();
            }
            None => {
                tracing::debug!(tracking_key = %record.tracking_key, "no matching order");
                record.state = default_state.to_string();
            }
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn postal_grid(rows: &[[&str; 10]]) -> Grid {
        let mut all = vec![
            vec![t("TTD POSTAL MANIFEST")],
            vec![],
            vec![t("Date: 01-01-2026")],
            ["S.No", "Tracking", "Name", "Address", "City", "Pincode", "Mobile", "Qty", "Weight", "Barcode"]
                .iter()
                .map(|s| t(s))
                .collect(),
        ];
        for r in rows {
            all.push(r.iter().map(|s| CellValue::from(*s)).collect());
        }
        Grid::from_rows(all)
    }

    fn orders_grid(rows: &[[&str; 3]]) -> Grid {
        let mut all = vec![vec![t("Booking No"), t("State"), t("Address")]];
        for r in rows {
            all.push(r.iter().map(|s| CellValue::from(*s)).collect());
        }
        Grid::from_rows(all)
    }

    #[test]
    fn load_postal_basic() {
        let grid = postal_grid(&[
            ["1", " TR1 ", "Ravi", "A, B", "Chennai", "600001", "+91 98765 43210", "3", "450", " EZ1IN "],
            ["2", "TR2", "Sita", "", "Madurai", "bad", "", "", "", ""],
        ]);
        let records = load_postal_records(&grid, &PostalConfig::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tracking_key, "TR1");
        assert_eq!(records[0].receiver_pincode, 600001);
        assert_eq!(records[0].receiver_mobile, "9876543210");
        assert_eq!(records[0].quantity, 3);
        assert_eq!(records[0].physical_weight_grams, 450);
        assert_eq!(records[0].barcode, "EZ1IN");
        assert_eq!(records[1].receiver_pincode, 0);
        assert_eq!(records[1].quantity, 1);
        assert_eq!(records[1].physical_weight_grams, 0);
    }

    #[test]
    fn load_postal_skips_blank_rows() {
        let mut grid = postal_grid(&[["1", "TR1", "Ravi", "A", "X", "600001", "", "1", "1", "B"]]);
        grid.push_row(vec![CellValue::Empty, t("   ")]);
        let records = load_postal_records(&grid, &PostalConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn load_postal_missing_header_row() {
        let grid = Grid::from_rows(vec![vec![t("only")]]);
        let err = load_postal_records(&grid, &PostalConfig::default()).unwrap_err();
        assert!(matches!(err, ReconError::MissingHeaderRow { input: Source::Postal, row: 3, height: 1 }));
    }

    #[test]
    fn pincode_filter_excludes_silently() {
        let grid = postal_grid(&[
            ["1", "TR1", "", "", "", "600001", "", "", "", ""],
            ["2", "TR2", "", "", "", "99999", "", "", "", ""],
            ["3", "TR3", "", "", "", "1000000", "", "", "", ""],
            ["4", "TR4", "", "", "", "100000", "", "", "", ""],
            ["5", "TR5", "", "", "", "999999", "", "", "", ""],
        ]);
        let records = load_postal_records(&grid, &PostalConfig::default()).unwrap();
        let (kept, excluded) = filter_pincodes(records, &FillConfig::default());
        assert_eq!(excluded, 2);
        let keys: Vec<&str> = kept.iter().map(|r| r.tracking_key.as_str()).collect();
        assert_eq!(keys, vec!["TR1", "TR4", "TR5"]);
    }

    #[test]
    fn order_index_first_occurrence_wins() {
        let grid = orders_grid(&[
            ["TR1", "Kerala", "First address"],
            ["TR1", "Karnataka", "Second address"],
            ["TR2", "Goa", ""],
        ]);
        let (index, rows) = load_order_index(&grid, &OrdersConfig::default()).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.get("TR1").unwrap().state, "Kerala");
        assert_eq!(index.get("TR1").unwrap().address, "First address");
    }

    #[test]
    fn order_index_requires_booking_and_state() {
        let grid = Grid::from_rows(vec![vec![t("Booking No"), t("Address")]]);
        let err = load_order_index(&grid, &OrdersConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "orders: missing column 'State'");
    }

    #[test]
    fn order_index_without_optional_columns() {
        let grid = Grid::from_rows(vec![
            vec![t("State"), t("Booking No")],
            vec![t("Goa"), CellValue::Number(1001.0)],
            vec![t("Goa"), CellValue::Empty],
        ]);
        let (index, rows) = load_order_index(&grid, &OrdersConfig::default()).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(index.len(), 1);
        let entry = index.get("1001").unwrap();
        assert_eq!(entry.address, "");
        assert_eq!(entry.category, None);
    }

    fn record(key: &str, address: &str) -> CanonicalRecord {
        CanonicalRecord {
            tracking_key: key.into(),
            receiver_name: String::new(),
            full_address: address.into(),
            receiver_city: String::new(),
            receiver_pincode: 600001,
            receiver_mobile: String::new(),
            quantity: 1,
            physical_weight_grams: 0,
            barcode: String::new(),
            category: None,
            state: String::new(),
        }
    }

    #[test]
    fn reconcile_hits_and_misses() {
        let mut index = OrderIndex::default();
        index.insert_first(
            "TR1".into(),
            OrderEntry {
                state: "Kerala".into(),
                address: "Order address".into(),
                category: Some("Big Diary".into()),
            },
        );
        index.insert_first(
            "TR2".into(),
            OrderEntry {
                state: String::new(),
                address: "Other".into(),
                category: None,
            },
        );

        let mut records = vec![record("TR1", ""), record("TR2", "Own address"), record("TR9", "Kept")];
        let matched = reconcile(&mut records, &index, "Tamil Nadu");

        assert_eq!(matched, 2);
        assert_eq!(records[0].state, "Kerala");
        assert_eq!(records[0].full_address, "Order address");
        assert_eq!(records[0].category.as_deref(), Some("Big Diary"));
        // Blank order state falls back; own address is never overwritten
        assert_eq!(records[1].state, "Tamil Nadu");
        assert_eq!(records[1].full_address, "Own address");
        assert_eq!(records[2].state, "Tamil Nadu");
        assert_eq!(records[2].full_address, "Kept");
    }
}
