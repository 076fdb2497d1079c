//! Cache module for storing station records on disk
//!
//! `CacheManager` persists JSON entries with the time they were stored.
//! `CacheGateway` sits on top of it and decides, from the stored timestamp and
//! an injectable clock, whether an entry is fresh enough to be served.

mod clock;
mod gateway;
mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gateway::{CacheGateway, CacheLookup, DEFAULT_FRESHNESS_WINDOW};
pub use manager::{CacheManager, CachedData};
