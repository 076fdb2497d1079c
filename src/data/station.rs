//! Validated station identifiers
//!
//! A station id ends up both in the image URL path and in the cache file
//! name, so only a conservative character set is accepted.

use std::fmt;
use thiserror::Error;

/// Longest accepted station id
pub const MAX_STATION_ID_LEN: usize = 64;

/// Errors produced when validating a station id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationIdError {
    /// The id is empty or only whitespace
    #[error("station id is empty")]
    Empty,

    /// The id exceeds [`MAX_STATION_ID_LEN`]
    #[error("station id is longer than {} characters", MAX_STATION_ID_LEN)]
    TooLong,

    /// The id contains a character outside `[A-Za-z0-9_-]`
    #[error("station id '{0}' contains characters other than letters, digits, '-' and '_'")]
    InvalidCharacters(String),
}

/// A station identifier safe for use as a URL segment and cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationId(String);

impl StationId {
    /// Validates raw input; surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> Result<Self, StationIdError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(StationIdError::Empty);
        }
        if id.len() > MAX_STATION_ID_LEN {
            return Err(StationIdError::TooLong);
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StationIdError::InvalidCharacters(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
