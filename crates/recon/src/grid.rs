use serde::Serialize;

/// A single typed cell, as read from (or written to) a worksheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

/// Shared blank cell for out-of-range reads.
pub const EMPTY_CELL: &CellValue = &CellValue::Empty;

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn number(n: impl Into<f64>) -> Self {
        Self::Number(n.into())
    }

    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering of the cell. Integral floats drop the fractional part,
    /// so a numeric pincode `600001.0` renders as `"600001"`.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    /// Numeric reading of the cell: numbers as-is, text parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() { Self::Empty } else { Self::Text(s) }
    }
}

impl From<Option<u32>> for CellValue {
    fn from(n: Option<u32>) -> Self {
        n.map_or(Self::Empty, |n| Self::Number(n.into()))
    }
}

/// Row-major grid of cells in absolute sheet coordinates (0-based).
///
/// Rows may have different lengths; reads past either edge return `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Number of rows, including leading blank rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY_CELL)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Set a cell, growing the grid with `Empty` cells as needed.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let r = &mut self.rows[row];
        if r.len() <= col {
            r.resize(col + 1, CellValue::Empty);
        }
        r[col] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_float_renders_without_fraction() {
        assert_eq!(CellValue::Number(600001.0).as_text(), "600001");
        assert_eq!(CellValue::Number(919876543210.0).as_text(), "919876543210");
        assert_eq!(CellValue::Number(2.5).as_text(), "2.5");
    }

    #[test]
    fn text_numbers_parse_after_trim() {
        assert_eq!(CellValue::text(" 42 ").as_number(), Some(42.0));
        assert_eq!(CellValue::text("n/a").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
        assert_eq!(CellValue::text("NaN").as_number(), None);
    }

    #[test]
    fn out_of_range_reads_are_empty() {
        let grid = Grid::from_rows(vec![vec![CellValue::text("a")]]);
        assert_eq!(grid.get(0, 0), &CellValue::text("a"));
        assert_eq!(grid.get(0, 5), &CellValue::Empty);
        assert_eq!(grid.get(9, 0), &CellValue::Empty);
        assert!(grid.row(9).is_empty());
    }

    #[test]
    fn set_grows_ragged_grid() {
        let mut grid = Grid::new();
        grid.set(2, 3, CellValue::number(7));
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.get(2, 3), &CellValue::Number(7.0));
        assert!(grid.get(1, 0).is_blank());
    }
}
