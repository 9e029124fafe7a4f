use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the pipeline treats as a constant. Every section defaults to
/// the TTD intake layout, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FillConfig {
    /// State assigned when the join misses or the order carries no state.
    pub default_state: String,
    pub postal: PostalConfig,
    pub orders: OrdersConfig,
    pub template: TemplateConfig,
    pub pincode: PincodeRange,
    pub address: AddressConfig,
    pub sender: SenderConfig,
    pub dimensions: DimensionConfig,
    pub output: OutputConfig,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            default_state: "Tamil Nadu".into(),
            postal: PostalConfig::default(),
            orders: OrdersConfig::default(),
            template: TemplateConfig::default(),
            pincode: PincodeRange::default(),
            address: AddressConfig::default(),
            sender: SenderConfig::default(),
            dimensions: DimensionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheet selection
// ---------------------------------------------------------------------------

/// A worksheet picked by 0-based position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl Default for SheetRef {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl std::fmt::Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Postal manifest layout. Headers are unreliable, so columns are positional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostalConfig {
    pub sheet: SheetRef,
    /// 0-based row holding the (ignored) header; data starts on the next row.
    pub header_row: usize,
    pub columns: PostalColumns,
}

impl Default for PostalConfig {
    fn default() -> Self {
        Self {
            sheet: SheetRef::Index(0),
            header_row: 3,
            columns: PostalColumns::default(),
        }
    }
}

/// 0-based column positions in the postal manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostalColumns {
    pub tracking: usize,
    pub name: usize,
    pub address: usize,
    pub city: usize,
    pub pincode: usize,
    pub mobile: usize,
    pub quantity: usize,
    pub weight: usize,
    pub barcode: usize,
}

impl Default for PostalColumns {
    fn default() -> Self {
        Self {
            tracking: 1,
            name: 2,
            address: 3,
            city: 4,
            pincode: 5,
            mobile: 6,
            quantity: 7,
            weight: 8,
            barcode: 9,
        }
    }
}

/// Orders report layout. Columns are looked up by header label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrdersConfig {
    pub sheet: SheetRef,
    pub header_row: usize,
    /// Required.
    pub booking_column: String,
    /// Required.
    pub state_column: String,
    /// Used when present in the header row.
    pub address_column: String,
    /// Used when present in the header row.
    pub category_column: String,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            sheet: SheetRef::Name("Publications_Report".into()),
            header_row: 0,
            booking_column: "Booking No".into(),
            state_column: "State".into(),
            address_column: "Address".into(),
            category_column: "Category".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    pub sheet: SheetRef,
}

// ---------------------------------------------------------------------------
// Record rules
// ---------------------------------------------------------------------------

/// Inclusive pincode bounds; records outside are dropped before the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PincodeRange {
    pub min: i64,
    pub max: i64,
}

impl Default for PincodeRange {
    fn default() -> Self {
        Self {
            min: 100_000,
            max: 999_999,
        }
    }
}

impl PincodeRange {
    pub fn contains(&self, pincode: i64) -> bool {
        (self.min..=self.max).contains(&pincode)
    }
}

/// How the segmenter fills lines when fewer than three segments remain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFill {
    /// Repeat the last known segment into empty lines.
    #[default]
    Forward,
    /// Leave lines 2 and 3 empty for a single segment.
    Sparse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddressConfig {
    /// Trailing segments (city, state, pincode) dropped from longer addresses.
    pub trailing_segments: usize,
    pub fill: AddressFill,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            trailing_segments: 3,
            fill: AddressFill::Forward,
        }
    }
}

/// Fixed sender block written on every output row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    pub mobile: u64,
    pub state: String,
    pub address: Vec<String>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            mobile: 1_234_567_890,
            state: "Andhra Pradesh".into(),
            address: vec![
                "SALES WING OF PUBLICATIONS".into(),
                "TTD PRESS COMPOUND".into(),
                "Tirupati-517507".into(),
            ],
        }
    }
}

impl SenderConfig {
    /// Sender address line `n` (1-based); empty when out of range.
    pub fn address_line(&self, n: usize) -> &str {
        n.checked_sub(1)
            .and_then(|i| self.address.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Category-aware lookup in the volumetric workbook.
    #[default]
    Tiered,
    /// Quantity-only rule; no volumetric workbook needed.
    Threshold,
}

impl std::fmt::Display for DimensionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tiered => write!(f, "tiered"),
            Self::Threshold => write!(f, "threshold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DimensionConfig {
    pub policy: DimensionPolicy,
    pub sheet: SheetRef,
    pub threshold: ThresholdConfig,
    pub blocks: BlockLayout,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            policy: DimensionPolicy::Tiered,
            sheet: SheetRef::Index(0),
            threshold: ThresholdConfig::default(),
            blocks: BlockLayout::default(),
        }
    }
}

/// Quantity-threshold box sizes as `[length, breadth, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Quantities at or above this use the large box.
    pub min_quantity: u32,
    pub large: [u32; 3],
    pub small: [u32; 3],
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_quantity: 5,
            large: [57, 44, 2],
            small: [25, 18, 4],
        }
    }
}

/// Position of one quantity table inside the volumetric sheet.
///
/// Rows are half-open (`first_row..end_row`). Columns run
/// quantity, length, breadth, height starting at `first_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlockConfig {
    pub first_row: usize,
    pub end_row: usize,
    pub first_col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockLayout {
    pub calendar: BlockConfig,
    pub table_calendar: BlockConfig,
    pub big_diary: BlockConfig,
    pub small_diary: BlockConfig,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            calendar: BlockConfig { first_row: 2, end_row: 22, first_col: 0 },
            table_calendar: BlockConfig { first_row: 2, end_row: 27, first_col: 6 },
            big_diary: BlockConfig { first_row: 28, end_row: 48, first_col: 0 },
            small_diary: BlockConfig { first_row: 28, end_row: 53, first_col: 6 },
        }
    }
}

impl BlockLayout {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &BlockConfig)> {
        [
            ("calendar", &self.calendar),
            ("table_calendar", &self.table_calendar),
            ("big_diary", &self.big_diary),
            ("small_diary", &self.small_diary),
        ]
        .into_iter()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Fill a copy of the template workbook, keeping its sheets and
    /// formatting. Applies when template and output are both `.xlsx`.
    pub from_template: bool,
    /// Worksheet name when a plain workbook is written instead.
    pub sheet: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            from_template: true,
            sheet: "Sheet1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl FillConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: FillConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.pincode.min > self.pincode.max {
            return Err(ReconError::ConfigValidation(format!(
                "pincode.min ({}) is greater than pincode.max ({})",
                self.pincode.min, self.pincode.max
            )));
        }

        if self.sender.address.len() != 3 {
            return Err(ReconError::ConfigValidation(format!(
                "sender.address must have exactly 3 lines, found {}",
                self.sender.address.len()
            )));
        }

        if self.postal.columns.tracking == self.postal.columns.pincode {
            return Err(ReconError::ConfigValidation(
                "postal.columns.tracking and postal.columns.pincode point at the same column".into(),
            ));
        }

        for (field, value) in [
            ("orders.booking_column", &self.orders.booking_column),
            ("orders.state_column", &self.orders.state_column),
        ] {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        if self.default_state.trim().is_empty() {
            return Err(ReconError::ConfigValidation("default_state must not be empty".into()));
        }

        if self.output.sheet.trim().is_empty() {
            return Err(ReconError::ConfigValidation("output.sheet must not be empty".into()));
        }

        for (name, block) in self.dimensions.blocks.iter() {
            if block.first_row >= block.end_row {
                return Err(ReconError::ConfigValidation(format!(
                    "dimensions.blocks.{name}: first_row ({}) must be below end_row ({})",
                    block.first_row, block.end_row
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
