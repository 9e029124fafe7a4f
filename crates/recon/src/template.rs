//! Template projection: one output row per reconciled record, laid out by
//! the template's own column labels.
//!
//! Columns are bound to fields once per schema by walking an ordered rule
//! table. The first generic rule whose marker appears in the (lowercased)
//! label wins; sender rules run afterwards and override, so a label such as
//! "Sender Add Line 1" resolves to the sender constant even though it also
//! contains the generic "add line 1" marker. Columns no rule claims keep the
//! template's default value.

use crate::address::{segment_address, AddressLines};
use crate::config::{AddressConfig, SenderConfig};
use crate::dimensions::{DimensionResolver, Dimensions};
use crate::grid::{CellValue, Grid};
use crate::model::{CanonicalRecord, TemplateSchema};

/// A value the projector knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Serial,
    Barcode,
    PhysicalWeight,
    ReceiverName,
    ReceiverCity,
    ReceiverPincode,
    ReceiverMobile,
    ReceiverState,
    /// Receiver address line 1..=3.
    AddressLine(usize),
    Length,
    Breadth,
    Height,
    SenderMobile,
    SenderState,
    /// Sender address line 1..=3.
    SenderAddressLine(usize),
}

/// What a template column is filled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnBinding {
    Field(Field),
    /// Template default for this column position.
    Default,
}

struct ColumnRule {
    field: Field,
    markers: &'static [&'static str],
}

impl ColumnRule {
    fn matches(&self, label: &str) -> bool {
        self.markers.iter().any(|m| label.contains(m))
    }
}

/// Generic rules in priority order.
const GENERIC_RULES: &[ColumnRule] = &[
    ColumnRule { field: Field::Serial, markers: &["serial"] },
    ColumnRule { field: Field::Barcode, markers: &["barcode"] },
    ColumnRule { field: Field::PhysicalWeight, markers: &["physical weight"] },
    ColumnRule { field: Field::ReceiverName, markers: &["receiver name"] },
    ColumnRule { field: Field::ReceiverCity, markers: &["receiver city"] },
    ColumnRule { field: Field::ReceiverPincode, markers: &["receiver pincode"] },
    ColumnRule { field: Field::ReceiverMobile, markers: &["receiver mobile"] },
    ColumnRule { field: Field::ReceiverState, markers: &["receiver state"] },
    ColumnRule { field: Field::AddressLine(1), markers: &["add line 1", "address line 1"] },
    ColumnRule { field: Field::AddressLine(2), markers: &["add line 2", "address line 2"] },
    ColumnRule { field: Field::AddressLine(3), markers: &["add line 3", "address line 3"] },
    ColumnRule { field: Field::Length, markers: &["length"] },
    ColumnRule { field: Field::Breadth, markers: &["breadth", "diameter"] },
    ColumnRule { field: Field::Height, markers: &["height"] },
];

/// Sender rules; evaluated after the generic table and always win.
const SENDER_RULES: &[ColumnRule] = &[
    ColumnRule { field: Field::SenderMobile, markers: &["sender mobile"] },
    ColumnRule { field: Field::SenderState, markers: &["sender state"] },
    ColumnRule { field: Field::SenderAddressLine(1), markers: &["sender add line 1", "sender address line 1"] },
    ColumnRule { field: Field::SenderAddressLine(2), markers: &["sender add line 2", "sender address line 2"] },
    ColumnRule { field: Field::SenderAddressLine(3), markers: &["sender add line 3", "sender address line 3"] },
];

/// Bind a single (already lowercased) label.
pub fn bind_label(label: &str) -> ColumnBinding {
    let generic = GENERIC_RULES.iter().find(|r| r.matches(label));
    let sender = SENDER_RULES.iter().find(|r| r.matches(label));
    match sender.or(generic) {
        Some(rule) => ColumnBinding::Field(rule.field),
        None => ColumnBinding::Default,
    }
}

/// Bind every template column.
pub fn bind_columns(schema: &TemplateSchema) -> Vec<ColumnBinding> {
    (0..schema.width())
        .map(|col| bind_label(&schema.label_key(col)))
        .collect()
}

/// Result of projecting records onto a template.
#[derive(Debug, Clone)]
pub struct Projection {
    pub grid: Grid,
    pub dimensions_unavailable: usize,
}

pub struct Projector<'a> {
    schema: &'a TemplateSchema,
    bindings: Vec<ColumnBinding>,
    sender: &'a SenderConfig,
    address: &'a AddressConfig,
    resolver: &'a dyn DimensionResolver,
}

/// Per-record values shared by every column of the row.
struct RowContext<'r> {
    serial: usize,
    record: &'r CanonicalRecord,
    lines: AddressLines,
    dims: Option<Dimensions>,
}

impl<'a> Projector<'a> {
    pub fn new(
        schema: &'a TemplateSchema,
        sender: &'a SenderConfig,
        address: &'a AddressConfig,
        resolver: &'a dyn DimensionResolver,
    ) -> Self {
        Self {
            schema,
            bindings: bind_columns(schema),
            sender,
            address,
            resolver,
        }
    }

    /// Template labels and defaults verbatim, then one row per record with a
    /// 1-based serial. Output row N (1-based) holds record N - 2.
    pub fn project(&self, records: &[CanonicalRecord]) -> Projection {
        let mut grid = Grid::new();
        grid.push_row(self.schema.labels.clone());
        grid.push_row(self.schema.defaults.clone());

        let mut dimensions_unavailable = 0;
        for (idx, record) in records.iter().enumerate() {
            let dims = self.resolver.resolve(record.category.as_deref(), record.quantity);
            if dims.is_none() {
                dimensions_unavailable += 1;
                tracing::warn!(
                    tracking_key = %record.tracking_key,
                    category = record.category.as_deref().unwrap_or(""),
                    quantity = record.quantity,
                    "no dimensions available"
                );
            }

            let ctx = RowContext {
                serial: idx + 1,
                record,
                lines: segment_address(&record.full_address, self.address),
                dims,
            };

            let row = self
                .bindings
                .iter()
                .enumerate()
                .map(|(col, binding)| match binding {
                    ColumnBinding::Field(field) => self.value(*field, &ctx),
                    ColumnBinding::Default => {
                        self.schema.defaults.get(col).cloned().unwrap_or_default()
                    }
                })
                .collect();
            grid.push_row(row);
        }

        Projection {
            grid,
            dimensions_unavailable,
        }
    }

    fn value(&self, field: Field, ctx: &RowContext<'_>) -> CellValue {
        let record = ctx.record;
        match field {
            Field::Serial => CellValue::Number(ctx.serial as f64),
            Field::Barcode => record.barcode.as_str().into(),
            Field::PhysicalWeight => CellValue::number(record.physical_weight_grams),
            Field::ReceiverName => record.receiver_name.as_str().into(),
            Field::ReceiverCity => record.receiver_city.as_str().into(),
            Field::ReceiverPincode => CellValue::Number(record.receiver_pincode as f64),
            Field::ReceiverMobile => record.receiver_mobile.as_str().into(),
            Field::ReceiverState => record.state.as_str().into(),
            Field::AddressLine(n) => ctx.lines.line(n).into(),
            Field::Length => ctx.dims.map(|d| d.length).into(),
            Field::Breadth => ctx.dims.map(|d| d.breadth).into(),
            Field::Height => ctx.dims.map(|d| d.height).into(),
            Field::SenderMobile => CellValue::Number(self.sender.mobile as f64),
            Field::SenderState => self.sender.state.as_str().into(),
            Field::SenderAddressLine(n) => self.sender.address_line(n).into(),
        }
    }
}
