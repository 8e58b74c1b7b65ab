//! Identifier normalization.
//!
//! Phone-number-like identifiers arrive from spreadsheets, keyboards and
//! barcode scanners in many shapes. This module folds them into a single
//! canonical form so that registry lookups can use exact string equality.

/// First code point of the Thai digit block (`๐`).
const THAI_DIGIT_ZERO: u32 = 0x0E50;

/// Last code point of the Thai digit block (`๙`).
const THAI_DIGIT_NINE: u32 = 0x0E59;

/// Canonicalize a phone-number-like identifier.
///
/// Thai numerals are folded to their ASCII equivalents and every hyphen
/// and whitespace character is removed. Nothing is reordered, truncated
/// or validated, so the function is total and idempotent.
///
/// ```
/// use rollcall::normalize::normalize;
///
/// assert_eq!(normalize("๐๘๑-๒๓๔ ๕๖๗๘"), "0812345678");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(fold_thai_digit)
        .collect()
}

/// Map a single Thai numeral to its ASCII digit, leaving other characters alone.
fn fold_thai_digit(c: char) -> char {
    let code = u32::from(c);
    if (THAI_DIGIT_ZERO..=THAI_DIGIT_NINE).contains(&code) {
        char::from_digit(code - THAI_DIGIT_ZERO, 10).unwrap_or(c)
    } else {
        c
    }
}
