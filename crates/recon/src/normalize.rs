//! Cell coercion into canonical field values.
//!
//! Nothing here fails: malformed input collapses to the field's default
//! (`""`, `0` or `1`) and the record invariants take it from there.

use crate::grid::CellValue;

/// Trimmed text rendering of a cell.
pub fn normalize_text(raw: &CellValue) -> String {
    raw.as_text().trim().to_string()
}

/// Reduce a phone number to its 10 national digits, or `""` when that is not
/// possible. A leading `91` country code is dropped from longer numbers.
pub fn normalize_mobile(raw: &CellValue) -> String {
    let mut digits: String = raw.as_text().chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 10 && digits.starts_with("91") {
        digits.drain(..2);
    }
    if digits.len() == 10 { digits } else { String::new() }
}

/// Pincode as an integer; unparseable input becomes `0`, which then fails
/// the pincode range check.
pub fn normalize_pincode(raw: &CellValue) -> i64 {
    raw.as_number().map(|n| n.trunc() as i64).unwrap_or(0)
}

/// Parcel quantity, at least 1.
pub fn normalize_quantity(raw: &CellValue) -> u32 {
    match raw.as_number() {
        Some(n) if n >= 1.0 => n.trunc().min(u32::MAX as f64) as u32,
        _ => 1,
    }
}

/// Physical weight in grams, never negative.
pub fn normalize_weight(raw: &CellValue) -> u32 {
    match raw.as_number() {
        Some(n) if n > 0.0 => n.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}
