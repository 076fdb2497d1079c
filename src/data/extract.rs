//! Price extraction from recognized board text
//!
//! Recognition of price boards is noisy: decimal commas, dropped separators
//! and superscript digits merged into the last visible digit all show up.
//! Extraction locates the line for a fuel kind and repairs the trailing
//! numeric token into a per-liter price.

use thiserror::Error;

/// Length of a stripped token that carries a merged superscript digit
pub const SUPERSCRIPT_TOKEN_LEN: usize = 5;

/// Highest per-liter price accepted without decimal repair
pub const PLAUSIBLE_MAX_PRICE: f64 = 2.0;

/// Thresholds used by the decimal-repair heuristics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairRules {
    /// A stripped token of exactly this length loses its last character
    pub superscript_len: usize,
    /// Parsed values above this get their decimal point repaired
    pub plausible_max: f64,
}

impl Default for RepairRules {
    fn default() -> Self {
        Self {
            superscript_len: SUPERSCRIPT_TOKEN_LEN,
            plausible_max: PLAUSIBLE_MAX_PRICE,
        }
    }
}

/// Reasons a fuel kind yields no price
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionMiss {
    /// No recognized line contains any of the keywords
    #[error("no line matches the fuel keywords")]
    NoMatchingLine,

    /// The matching line has no tokens
    #[error("matching line is empty")]
    EmptyToken,

    /// The last token of the matching line holds no digits
    #[error("token '{0}' contains no digits")]
    NoDigits(String),

    /// The repaired token is not a number
    #[error("token '{0}' is not a price")]
    Unparseable(String),

    /// The repaired value is zero or negative
    #[error("token '{0}' is not a positive price")]
    NotPositive(String),
}

/// Extracts the price for a keyword set, returning `None` on any miss.
pub fn extract_price(lines: &[String], keywords: &[&str], rules: &RepairRules) -> Option<f64> {
    match try_extract_price(lines, keywords, rules) {
        Ok(price) => Some(price),
        Err(miss) => {
            tracing::debug!(?keywords, %miss, "price extraction missed");
            None
        }
    }
}

/// Extracts the price for a keyword set
///
/// The first line (in recognition order) containing any keyword wins. Its
/// last whitespace-separated token is normalized and repaired:
///
/// 1. commas become periods, everything but digits and periods is dropped
/// 2. a token of `rules.superscript_len` characters loses its last character
/// 3. a value above `rules.plausible_max` is rebuilt as `d0.d1` from its
///    first two characters, unless the second one is already a separator
pub fn try_extract_price(
    lines: &[String],
    keywords: &[&str],
    rules: &RepairRules,
) -> Result<f64, ExtractionMiss> {
    let line = find_line(lines, keywords).ok_or(ExtractionMiss::NoMatchingLine)?;
    let token = line
        .split_whitespace()
        .last()
        .ok_or(ExtractionMiss::EmptyToken)?;

    let mut stripped: String = token
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !stripped.chars().any(|c| c.is_ascii_digit()) {
        return Err(ExtractionMiss::NoDigits(token.to_string()));
    }

    if stripped.chars().count() == rules.superscript_len {
        stripped.pop();
    }

    let value: f64 = stripped
        .parse()
        .map_err(|_| ExtractionMiss::Unparseable(token.to_string()))?;

    let value = if value > rules.plausible_max {
        repair_decimal_point(&stripped, value)
            .ok_or_else(|| ExtractionMiss::Unparseable(token.to_string()))?
    } else {
        value
    };

    if value > 0.0 {
        Ok(value)
    } else {
        Err(ExtractionMiss::NotPositive(token.to_string()))
    }
}

/// Returns the first line whose lowercase form contains any keyword
fn find_line<'a>(lines: &'a [String], keywords: &[&str]) -> Option<&'a str> {
    lines
        .iter()
        .find(|line| {
            let lower = line.to_lowercase();
            keywords.iter().any(|keyword| lower.contains(keyword))
        })
        .map(String::as_str)
}

/// Rebuilds a value as `first_digit.second_digit`, discarding the rest
///
/// A token whose second character is a separator (`2.15`) was read with its
/// decimal point in place and keeps its parsed value.
fn repair_decimal_point(stripped: &str, parsed: f64) -> Option<f64> {
    let mut chars = stripped.chars();
    let first = chars.next()?;
    let second = chars.next()?;
    if second == '.' {
        return Some(parsed);
    }
    format!("{}.{}", first, second).parse().ok()
}
