//! Freshness decisions over the station record cache

use std::sync::Arc;
use std::time::Duration;

use super::{CacheManager, CachedData, Clock};
use crate::data::{StationId, StationRecord};

/// Default age after which a cached record must be refreshed
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// Result of looking up a station in the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    /// The stored record; only loaded when the entry is fresh
    pub entry: Option<CachedData<StationRecord>>,
    /// Time since the entry was stored; `Duration::MAX` when there is no usable entry
    pub age: Duration,
}

impl CacheLookup {
    fn miss() -> Self {
        Self {
            entry: None,
            age: Duration::MAX,
        }
    }
}

/// Reads and writes station records with freshness bookkeeping
#[derive(Clone)]
pub struct CacheGateway {
    manager: CacheManager,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
}

impl CacheGateway {
    pub fn new(manager: CacheManager, clock: Arc<dyn Clock>, freshness_window: Duration) -> Self {
        Self {
            manager,
            clock,
            freshness_window,
        }
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Whether an entry of this age may be served
    pub fn is_fresh(&self, age: Duration) -> bool {
        age < self.freshness_window
    }

    /// Looks up the entry for a station
    ///
    /// The age comes from the entry header alone; the record is deserialized
    /// only when the entry is fresh. Missing and unreadable entries are both
    /// reported as a miss with infinite age.
    pub fn lookup(&self, station_id: &StationId) -> CacheLookup {
        let Some(stored_at) = self.manager.stored_at(station_id.as_str()) else {
            return CacheLookup::miss();
        };

        // A timestamp from the future (clock skew) counts as just stored
        let age = (self.clock.now() - stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if !self.is_fresh(age) {
            return CacheLookup { entry: None, age };
        }

        match self.manager.read::<StationRecord>(station_id.as_str()) {
            Some(entry) => CacheLookup {
                entry: Some(entry),
                age,
            },
            None => {
                tracing::warn!(
                    station_id = %station_id,
                    "cached record is unreadable, treating as miss"
                );
                CacheLookup::miss()
            }
        }
    }

    /// Returns the cached record if it is fresh
    pub fn fresh_record(&self, station_id: &StationId) -> Option<StationRecord> {
        self.lookup(station_id).entry.map(|entry| entry.data)
    }

    /// Stores a record under the station id, replacing any previous entry
    pub fn store(&self, station_id: &StationId, record: &StationRecord) -> std::io::Result<()> {
        self.manager
            .write(station_id.as_str(), record, self.clock.now())
    }

    /// Keeps the board image a record was recognized from next to the record
    pub fn archive_image(&self, station_id: &StationId, bytes: &[u8]) -> std::io::Result<()> {
        self.manager.write_image(station_id.as_str(), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::data::Status;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (CacheGateway, Arc<ManualClock>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        ));
        let gateway = CacheGateway::new(
            CacheManager::with_dir(temp_dir.path().to_path_buf()),
            clock.clone(),
            DEFAULT_FRESHNESS_WINDOW,
        );
        (gateway, clock, temp_dir)
    }

    fn station() -> StationId {
        StationId::parse("1001").unwrap()
    }

    fn record() -> StationRecord {
        StationRecord {
            station_id: "1001".to_string(),
            euro95: Some(1.89),
            euro98: None,
            diesel: Some(1.69),
            lpg: None,
            ocr_station_line: Some("BP Snelweg".to_string()),
            status: Status::Ok,
        }
    }

    #[test]
    fn test_missing_entry_has_infinite_age() {
        let (gateway, _clock, _dir) = setup();

        let lookup = gateway.lookup(&station());

        assert!(lookup.entry.is_none());
        assert_eq!(lookup.age, Duration::MAX);
        assert!(!gateway.is_fresh(lookup.age));
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let (gateway, clock, _dir) = setup();
        gateway.store(&station(), &record()).unwrap();
        clock.advance(chrono::Duration::seconds(600));

        let lookup = gateway.lookup(&station());

        assert_eq!(lookup.age, Duration::from_secs(600));
        assert_eq!(lookup.entry.map(|e| e.data), Some(record()));
        assert_eq!(gateway.fresh_record(&station()), Some(record()));
    }

    #[test]
    fn test_entry_at_window_boundary_is_stale() {
        let (gateway, clock, _dir) = setup();
        gateway.store(&station(), &record()).unwrap();
        clock.advance(chrono::Duration::seconds(3599));
        assert!(gateway.fresh_record(&station()).is_some());

        clock.advance(chrono::Duration::seconds(1));
        let lookup = gateway.lookup(&station());

        assert_eq!(lookup.age, Duration::from_secs(3600));
        assert!(lookup.entry.is_none());
        assert!(gateway.fresh_record(&station()).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let (gateway, _clock, dir) = setup();
        fs::write(dir.path().join("1001.json"), "garbage").unwrap();

        let lookup = gateway.lookup(&station());

        assert!(lookup.entry.is_none());
        assert_eq!(lookup.age, Duration::MAX);
    }

    #[test]
    fn test_store_replaces_previous_entry() {
        let (gateway, clock, _dir) = setup();
        gateway.store(&station(), &record()).unwrap();
        clock.advance(chrono::Duration::seconds(4000));

        let replacement = StationRecord::upstream_error("1001", 404);
        gateway.store(&station(), &replacement).unwrap();

        let lookup = gateway.lookup(&station());
        assert_eq!(lookup.age, Duration::ZERO);
        assert_eq!(lookup.entry.map(|e| e.data), Some(replacement));
    }

    #[test]
    fn test_archived_image_does_not_affect_lookup() {
        let (gateway, _clock, dir) = setup();

        gateway.archive_image(&station(), b"board").unwrap();

        assert_eq!(fs::read(dir.path().join("1001.png")).unwrap(), b"board");
        assert_eq!(gateway.lookup(&station()).age, Duration::MAX);
    }

    #[test]
    fn test_custom_freshness_window() {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gateway = CacheGateway::new(
            CacheManager::with_dir(temp_dir.path().to_path_buf()),
            clock.clone(),
            Duration::from_secs(60),
        );
        gateway.store(&station(), &record()).unwrap();

        clock.advance(chrono::Duration::seconds(61));

        assert!(gateway.fresh_record(&station()).is_none());
        assert_eq!(gateway.freshness_window(), Duration::from_secs(60));
    }
}
