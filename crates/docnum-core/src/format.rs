//! # Full-Code Formatter
//!
//! The single place where numbering-format knowledge lives. Everything that
//! renders a full code — issuance, previews, reporting — calls
//! [`full_code`]; no other module concatenates code segments.
//!
//! Template: `{classification_code}/{unit_code}/{sequence}/{year}`, with the
//! sequence rendered as plain decimal (no padding, no locale grouping).

/// Render the human-readable composite code for an issued number.
///
/// Pure and stable: identical inputs always yield an identical string.
///
/// ```
/// use docnum_core::full_code;
///
/// assert_eq!(
///     full_code("OT.02.01", "D.IX.2.1", 659, 2026),
///     "OT.02.01/D.IX.2.1/659/2026"
/// );
/// ```
pub fn full_code(classification_code: &str, unit_code: &str, sequence: i64, year: i32) -> String {
    format!("{classification_code}/{unit_code}/{sequence}/{year}")
}
