//! Static keyword catalog for price-board lines
//!
//! Each fuel kind maps to the lowercase substrings that identify its line in
//! recognized board text. Variants cover the spellings seen on Dutch boards
//! and the EU fuel labels printed next to them.

use super::FuelKind;

const EURO95_KEYWORDS: &[&str] = &["euro 95", "euro95", "(e10)"];
const EURO98_KEYWORDS: &[&str] = &["euro 98", "euro98", "e5"];
const DIESEL_KEYWORDS: &[&str] = &["diesel", "(b7)"];
const LPG_KEYWORDS: &[&str] = &["lpg"];

/// Returns the keyword variants identifying the line of a fuel kind
pub fn keywords_for(kind: FuelKind) -> &'static [&'static str] {
    match kind {
        FuelKind::Euro95 => EURO95_KEYWORDS,
        FuelKind::Euro98 => EURO98_KEYWORDS,
        FuelKind::Diesel => DIESEL_KEYWORDS,
        FuelKind::Lpg => LPG_KEYWORDS,
    }
}
