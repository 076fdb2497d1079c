//! Core data models for station price records
//!
//! This module contains the record types produced by the resolution pipeline
//! together with the text-recognition heuristics that fill them.

pub mod extract;
pub mod keywords;
pub mod record;
pub mod station;

pub use extract::{extract_price, try_extract_price, ExtractionMiss, RepairRules};
pub use keywords::keywords_for;
pub use record::{assemble, FetchOutcome};
pub use station::{StationId, StationIdError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fuel kinds listed on a price board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelKind {
    /// Euro 95 (E10) petrol
    Euro95,
    /// Euro 98 (E5) petrol
    Euro98,
    /// Diesel (B7)
    Diesel,
    /// Liquefied petroleum gas
    Lpg,
}

impl FuelKind {
    /// Returns a slice containing all fuel kinds.
    pub fn all() -> &'static [FuelKind] {
        &[
            FuelKind::Euro95,
            FuelKind::Euro98,
            FuelKind::Diesel,
            FuelKind::Lpg,
        ]
    }

    /// Returns the name used for this fuel kind in records and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelKind::Euro95 => "euro95",
            FuelKind::Euro98 => "euro98",
            FuelKind::Diesel => "diesel",
            FuelKind::Lpg => "lpg",
        }
    }

    /// Parses user input into a FuelKind.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Returns `None` if the input doesn't name a known fuel kind.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<FuelKind> {
        match s.trim().to_lowercase().as_str() {
            "euro95" => Some(FuelKind::Euro95),
            "euro98" => Some(FuelKind::Euro98),
            "diesel" => Some(FuelKind::Diesel),
            "lpg" => Some(FuelKind::Lpg),
            _ => None,
        }
    }
}

impl fmt::Display for FuelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text used on the wire for [`Status::Uncertain`]
pub const UNCERTAIN_STATUS_TEXT: &str = "Station exists?";

/// Outcome classification of a station record
///
/// Serialized as a plain string: `"Ok"`, `"Station exists?"` or the upstream
/// HTTP status code (e.g. `"404"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Status {
    /// Both mandatory fuels were recognized
    Ok,
    /// Euro 95 or diesel could not be recognized
    Uncertain,
    /// The image source answered with a non-success status
    UpstreamError(u16),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("Ok"),
            Status::Uncertain => f.write_str(UNCERTAIN_STATUS_TEXT),
            Status::UpstreamError(code) => write!(f, "{}", code),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for Status {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Ok" => Ok(Status::Ok),
            UNCERTAIN_STATUS_TEXT => Ok(Status::Uncertain),
            other => other
                .parse::<u16>()
                .map(Status::UpstreamError)
                .map_err(|_| format!("unknown station status: '{}'", other)),
        }
    }
}

/// Prices resolved for a single station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Identifier of the station at the image source
    pub station_id: String,
    /// Euro 95 price per liter
    pub euro95: Option<f64>,
    /// Euro 98 price per liter
    pub euro98: Option<f64>,
    /// Diesel price per liter
    pub diesel: Option<f64>,
    /// LPG price per liter
    pub lpg: Option<f64>,
    /// First recognized line of the board, usually the station name
    pub ocr_station_line: Option<String>,
    /// Overall classification of the record
    pub status: Status,
}

impl StationRecord {
    /// Creates the record stored when the image source refuses the request.
    pub fn upstream_error(station_id: &str, code: u16) -> Self {
        Self {
            station_id: station_id.to_string(),
            euro95: None,
            euro98: None,
            diesel: None,
            lpg: None,
            ocr_station_line: None,
            status: Status::UpstreamError(code),
        }
    }

    /// Returns the price recorded for the given fuel kind.
    pub fn price(&self, kind: FuelKind) -> Option<f64> {
        match kind {
            FuelKind::Euro95 => self.euro95,
            FuelKind::Euro98 => self.euro98,
            FuelKind::Diesel => self.diesel,
            FuelKind::Lpg => self.lpg,
        }
    }

    /// Reduces the record to the price of a single fuel kind.
    pub fn narrow(&self, kind: FuelKind) -> NarrowedRecord {
        NarrowedRecord {
            station_id: self.station_id.clone(),
            price: self.price(kind),
            ocr_station_line: self.ocr_station_line.clone(),
            status: self.status,
        }
    }
}

/// A station record reduced to one fuel kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrowedRecord {
    pub station_id: String,
    pub price: Option<f64>,
    pub ocr_station_line: Option<String>,
    pub status: Status,
}

/// What a resolution hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PriceView {
    /// The complete record
    Full(StationRecord),
    /// The record narrowed by a fuel filter
    Narrowed(NarrowedRecord),
}
