//! Station record assembly
//!
//! Turns the outcome of fetching and recognizing a price board into a
//! [`StationRecord`] with a status classification.

use super::extract::{extract_price, RepairRules};
use super::keywords::keywords_for;
use super::{FuelKind, StationId, StationRecord, Status};

/// What the image source and recognition produced for a station
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The board was fetched and recognized into these lines
    Recognized(Vec<String>),
    /// The image source answered with this non-success HTTP status
    Upstream(u16),
}

/// Builds the record for a station from a fetch outcome
///
/// A record is `Ok` only when both euro 95 and diesel were recognized; these
/// are sold at practically every station, so missing either one usually means
/// the board (or the station) is not what was expected.
pub fn assemble(
    station_id: &StationId,
    outcome: &FetchOutcome,
    rules: &RepairRules,
) -> StationRecord {
    let lines = match outcome {
        FetchOutcome::Upstream(code) => {
            return StationRecord::upstream_error(station_id.as_str(), *code)
        }
        FetchOutcome::Recognized(lines) => lines,
    };

    let price = |kind: FuelKind| extract_price(lines, keywords_for(kind), rules);
    let euro95 = price(FuelKind::Euro95);
    let euro98 = price(FuelKind::Euro98);
    let diesel = price(FuelKind::Diesel);
    let lpg = price(FuelKind::Lpg);

    let status = if euro95.is_some() && diesel.is_some() {
        Status::Ok
    } else {
        Status::Uncertain
    };

    StationRecord {
        station_id: station_id.to_string(),
        euro95,
        euro98,
        diesel,
        lpg,
        ocr_station_line: lines.first().cloned(),
        status,
    }
}
