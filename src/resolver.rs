//! Station price resolution
//!
//! Ties the cache, the image source and the recognition engine together:
//! serve a fresh cached record when there is one, otherwise fetch, recognize,
//! assemble and store a new one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::cache::{CacheGateway, CacheManager, SystemClock};
use crate::config::Settings;
use crate::data::{
    assemble, FetchOutcome, FuelKind, PriceView, RepairRules, StationId, StationIdError,
    StationRecord,
};
use crate::fetch::{FetchError, FetchResponse, ImageSource, PriceBoardClient};
use crate::ocr::{normalize_image, OcrEngine, TesseractOcr};

/// Errors returned to callers of [`Resolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The station id is not safe to use
    #[error("Invalid station id: {0}")]
    InvalidStationId(#[from] StationIdError),

    /// The fuel filter names no known fuel kind
    #[error("Invalid fuel kind: '{0}'. Valid fuel kinds: euro95, euro98, diesel, lpg")]
    InvalidFuelKind(String),

    /// The image source could not be reached
    #[error("Failed to fetch price board: {0}")]
    Fetch(#[from] FetchError),

    /// The resolved record could not be persisted
    #[error("Failed to store station record: {0}")]
    CacheWrite(#[source] std::io::Error),
}

/// Resolves station ids into price records
pub struct Resolver {
    cache: CacheGateway,
    source: Arc<dyn ImageSource>,
    ocr: Arc<dyn OcrEngine>,
    rules: RepairRules,
    /// One gate per station currently being refreshed
    in_flight: Mutex<HashMap<StationId, Gate>>,
}

impl Resolver {
    pub fn new(
        cache: CacheGateway,
        source: Arc<dyn ImageSource>,
        ocr: Arc<dyn OcrEngine>,
        rules: RepairRules,
    ) -> Self {
        Self {
            cache,
            source,
            ocr,
            rules,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a resolver backed by the price-board service and tesseract
    ///
    /// Uses the configured cache directory, the XDG cache directory when none
    /// is configured, and `./cache` when neither is available.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let manager = match &settings.cache_dir {
            Some(dir) => CacheManager::with_dir(dir.clone()),
            None => CacheManager::new()
                .unwrap_or_else(|| CacheManager::with_dir(PathBuf::from("cache"))),
        };
        tracing::debug!(cache_dir = %manager.cache_dir().display(), "using cache directory");

        let cache = CacheGateway::new(manager, Arc::new(SystemClock), settings.freshness_window());
        let source =
            PriceBoardClient::new(settings.image_base_url.clone(), settings.fetch_timeout())?;
        let ocr = TesseractOcr::new(
            settings.tesseract_command.clone(),
            settings.tesseract_language.clone(),
            settings.ocr_timeout(),
        );

        Ok(Self::new(
            cache,
            Arc::new(source),
            Arc::new(ocr),
            settings.repair_rules(),
        ))
    }

    /// Resolves a station, optionally narrowed to one fuel kind
    ///
    /// Inputs are validated before any I/O happens. The fuel filter only
    /// shapes the returned view; the cache always holds the full record.
    pub async fn resolve(
        &self,
        station_id: &str,
        fuel: Option<&str>,
    ) -> Result<PriceView, ResolveError> {
        let fuel = fuel
            .map(|f| {
                FuelKind::from_str(f).ok_or_else(|| ResolveError::InvalidFuelKind(f.to_string()))
            })
            .transpose()?;
        let station_id = StationId::parse(station_id)?;

        let record = self.resolve_record(&station_id).await?;

        Ok(match fuel {
            Some(kind) => PriceView::Narrowed(record.narrow(kind)),
            None => PriceView::Full(record),
        })
    }

    /// Returns the full record for a station, refreshing it when stale
    pub async fn resolve_record(
        &self,
        station_id: &StationId,
    ) -> Result<StationRecord, ResolveError> {
        if let Some(record) = self.cached_record(station_id).await {
            tracing::debug!(%station_id, "serving cached record");
            return Ok(record);
        }

        // The lease clears the gate entry even if this future is dropped while waiting
        let lease = self.gate(station_id);
        let _guard = lease.gate.lock().await;

        // Another request may have refreshed the entry while we waited
        match self.cached_record(station_id).await {
            Some(record) => {
                tracing::debug!(%station_id, "serving record refreshed by concurrent request");
                Ok(record)
            }
            None => self.refresh(station_id).await,
        }
    }

    /// Fetches, recognizes, assembles and stores a new record
    async fn refresh(&self, station_id: &StationId) -> Result<StationRecord, ResolveError> {
        tracing::info!(%station_id, "refreshing station record");

        let outcome = match self.source.fetch(station_id).await? {
            FetchResponse::Status(code) => FetchOutcome::Upstream(code),
            FetchResponse::Image(bytes) => {
                self.archive_image(station_id, &bytes).await;
                FetchOutcome::Recognized(self.recognize(station_id, bytes).await)
            }
        };

        let record = assemble(station_id, &outcome, &self.rules);
        self.store(station_id, &record).await?;

        tracing::info!(%station_id, status = %record.status, "stored station record");
        Ok(record)
    }

    /// Reads the fresh cached record off the async workers
    async fn cached_record(&self, station_id: &StationId) -> Option<StationRecord> {
        let cache = self.cache.clone();
        let id = station_id.clone();
        match tokio::task::spawn_blocking(move || cache.fresh_record(&id)).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(%station_id, error = %e, "cache read task failed");
                None
            }
        }
    }

    /// Writes a record off the async workers
    async fn store(
        &self,
        station_id: &StationId,
        record: &StationRecord,
    ) -> Result<(), ResolveError> {
        let cache = self.cache.clone();
        let id = station_id.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || cache.store(&id, &record))
            .await
            .map_err(|e| {
                ResolveError::CacheWrite(std::io::Error::new(std::io::ErrorKind::Other, e))
            })?
            .map_err(ResolveError::CacheWrite)
    }

    /// Keeps the fetched board image; a failure only costs the archive copy
    async fn archive_image(&self, station_id: &StationId, bytes: &[u8]) {
        let cache = self.cache.clone();
        let id = station_id.clone();
        let bytes = bytes.to_vec();
        match tokio::task::spawn_blocking(move || cache.archive_image(&id, &bytes)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(%station_id, error = %e, "failed to archive board image"),
            Err(e) => tracing::warn!(%station_id, error = %e, "board image archive task failed"),
        }
    }

    /// Recognizes board text; failures leave the record without prices
    async fn recognize(&self, station_id: &StationId, bytes: Vec<u8>) -> Vec<String> {
        let image = match tokio::task::spawn_blocking(move || {
            let normalized = normalize_image(&bytes);
            (bytes, normalized)
        })
        .await
        {
            Ok((_, Ok(normalized))) => normalized,
            Ok((original, Err(e))) => {
                tracing::warn!(
                    %station_id,
                    error = %e,
                    "image normalization failed, recognizing original"
                );
                original
            }
            Err(e) => {
                tracing::warn!(%station_id, error = %e, "image normalization task failed");
                return Vec::new();
            }
        };

        match self.ocr.recognize(&image).await {
            Ok(lines) => {
                tracing::debug!(%station_id, lines = lines.len(), "recognized price board");
                lines
            }
            Err(e) => {
                tracing::warn!(%station_id, error = %e, "price board recognition failed");
                Vec::new()
            }
        }
    }

    fn gate(&self, station_id: &StationId) -> GateLease<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let gate = in_flight.entry(station_id.clone()).or_default().clone();
        GateLease {
            in_flight: &self.in_flight,
            station_id: station_id.clone(),
            gate,
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// A caller's hold on the refresh gate of one station
///
/// Dropping the last lease removes the gate from the in-flight map.
struct GateLease<'a> {
    in_flight: &'a Mutex<HashMap<StationId, Gate>>,
    station_id: StationId,
    gate: Gate,
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // The map and this lease hold one reference each; anything more is a waiter
        let is_last = Arc::strong_count(&self.gate) <= 2;
        let is_current = in_flight
            .get(&self.station_id)
            .map_or(false, |gate| Arc::ptr_eq(gate, &self.gate));
        if is_last && is_current {
            in_flight.remove(&self.station_id);
        }
    }
}
