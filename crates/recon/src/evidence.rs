use sha2::{Digest, Sha256};

use crate::grid::{CellValue, Grid};

/// SHA-256 over the grid's typed cell values, row by row.
///
/// Each cell is written as a type tag plus its canonical text, so `"1"` and
/// `1.0` hash differently and trailing blank cells do not.
pub fn fingerprint_grid(grid: &Grid) -> String {
    let mut hasher = Sha256::new();
    for row in grid.rows() {
        let used = row.iter().rposition(|c| *c != CellValue::Empty).map_or(0, |i| i + 1);
        for cell in &row[..used] {
            match cell {
                CellValue::Empty => hasher.update(b"E"),
                CellValue::Text(s) => {
                    hasher.update(b"S");
                    hasher.update((s.len() as u64).to_le_bytes());
                    hasher.update(s.as_bytes());
                }
                CellValue::Number(n) => {
                    hasher.update(b"N");
                    hasher.update(n.to_bits().to_le_bytes());
                }
                CellValue::Bool(b) => hasher.update(if *b { b"T" } else { b"F" }),
            }
        }
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_grids_share_fingerprint() {
        let a = Grid::from_rows(vec![vec![CellValue::text("x"), CellValue::number(1)]]);
        let b = a.clone();
        assert_eq!(fingerprint_grid(&a), fingerprint_grid(&b));
        assert_eq!(fingerprint_grid(&a).len(), 64);
    }

    #[test]
    fn cell_type_changes_fingerprint() {
        let text = Grid::from_rows(vec![vec![CellValue::text("1")]]);
        let number = Grid::from_rows(vec![vec![CellValue::number(1)]]);
        assert_ne!(fingerprint_grid(&text), fingerprint_grid(&number));
    }

    #[test]
    fn trailing_empty_cells_ignored() {
        let short = Grid::from_rows(vec![vec![CellValue::text("a")]]);
        let padded = Grid::from_rows(vec![vec![CellValue::text("a"), CellValue::Empty]]);
        assert_eq!(fingerprint_grid(&short), fingerprint_grid(&padded));
    }
}
