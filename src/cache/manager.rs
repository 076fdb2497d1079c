//! Cache manager for persisting station records to disk
//!
//! Provides a `CacheManager` that stores serializable data to JSON files
//! together with the time they were stored. Writes go through a temporary
//! file that is renamed over the target, so readers see either the previous
//! entry or the new one, never a partial file.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// Key the entry was stored under
    key: String,
    /// When the data was stored
    stored_at: DateTime<Utc>,
    /// The cached data
    data: T,
}

/// Envelope fields read without materializing the payload
#[derive(Debug, Deserialize)]
struct CacheHeader {
    stored_at: DateTime<Utc>,
}

/// Result of reading from cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was stored
    pub stored_at: DateTime<Utc>,
}

/// Manages reading and writing cached data to disk
///
/// The cache manager stores data as JSON files in an XDG-compliant cache
/// directory (`~/.cache/gasprice/` on Linux), one file per key. Entries never
/// expire on their own; freshness is decided by the caller from `stored_at`.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "gasprice")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Returns the directory cache files are written to
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Returns the path of the archived image for the given key
    pub fn image_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.png", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes data to the cache, replacing any existing entry for the key
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the cache entry (e.g., a station id)
    /// * `data` - The data to cache (must implement Serialize)
    /// * `stored_at` - Timestamp recorded with the entry
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation, writing or the final rename fails
    pub fn write<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        stored_at: DateTime<Utc>,
    ) -> std::io::Result<()> {
        self.ensure_dir()?;

        let entry = CacheEntry {
            key: key.to_string(),
            stored_at,
            data,
        };

        let json = serde_json::to_vec_pretty(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        self.replace_file(&self.cache_path(key), &json)
    }

    /// Stores the raw image a record was recognized from as `{key}.png`
    ///
    /// Kept next to the record so recognition mistakes can be checked later.
    /// Replaces any previous image for the key.
    pub fn write_image(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.ensure_dir()?;
        self.replace_file(&self.image_path(key), bytes)
    }

    /// Writes `contents` to a temporary file and renames it over `path`
    fn replace_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Returns when the entry for `key` was stored
    ///
    /// Only the envelope header is interpreted; the payload is skipped. Returns
    /// `None` if the entry doesn't exist or cannot be parsed.
    pub fn stored_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let content = fs::read_to_string(self.cache_path(key)).ok()?;
        let header: CacheHeader = serde_json::from_str(&content).ok()?;
        Some(header.stored_at)
    }

    /// Reads data from the cache
    ///
    /// # Arguments
    /// * `key` - The cache key to read
    ///
    /// # Returns
    /// * `Some(CachedData<T>)` if the entry exists and can be parsed
    /// * `None` if the entry doesn't exist or parsing fails
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let path = self.cache_path(key);
        let content = fs::read_to_string(path).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;

        Some(CachedData {
            data: entry.data,
            stored_at: entry.stored_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_write_creates_file_in_cache_directory() {
        let (cache, temp_dir) = create_test_cache();
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        cache
            .write("test_key", &data, timestamp())
            .expect("Write should succeed");

        let expected_path = temp_dir.path().join("test_key.json");
        assert!(expected_path.exists(), "Cache file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"key\": \"test_key\""));
        assert!(content.contains("\"stored_at\""));
        assert!(content.contains("\"test\""));
        assert!(content.contains("42"));
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let (cache, temp_dir) = create_test_cache();
        let data = TestData {
            name: "tidy".to_string(),
            value: 1,
        };

        cache.write("tidy_key", &data, timestamp()).unwrap();
        cache.write("tidy_key", &data, timestamp()).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("tidy_key.json")]);
    }

    #[test]
    fn test_read_returns_none_for_missing_key() {
        let (cache, _temp_dir) = create_test_cache();

        let result: Option<CachedData<TestData>> = cache.read("nonexistent_key");

        assert!(result.is_none(), "Should return None for missing key");
        assert!(cache.stored_at("nonexistent_key").is_none());
    }

    #[test]
    fn test_read_returns_data_and_timestamp() {
        let (cache, _temp_dir) = create_test_cache();
        let data = TestData {
            name: "fresh".to_string(),
            value: 100,
        };

        cache.write("fresh_key", &data, timestamp()).unwrap();

        let result: CachedData<TestData> = cache.read("fresh_key").expect("Should read cache");
        assert_eq!(result.data, data);
        assert_eq!(result.stored_at, timestamp());
    }

    #[test]
    fn test_stored_at_ignores_payload_shape() {
        let (cache, _temp_dir) = create_test_cache();
        let data = TestData {
            name: "header".to_string(),
            value: 7,
        };

        cache.write("header_key", &data, timestamp()).unwrap();

        assert_eq!(cache.stored_at("header_key"), Some(timestamp()));
        // A reader expecting a different payload type fails, the header does not
        assert!(cache.read::<Vec<u8>>("header_key").is_none());
    }

    #[test]
    fn test_corrupt_entry_reads_as_missing() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        assert!(cache.read::<TestData>("broken").is_none());
        assert!(cache.stored_at("broken").is_none());
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let cache = CacheManager::with_dir(nested_path.clone());

        let data = TestData {
            name: "nested".to_string(),
            value: 1,
        };

        cache.write("nested_key", &data, timestamp()).unwrap();

        assert!(nested_path.exists(), "Nested directory should be created");
        assert!(nested_path.join("nested_key.json").exists(), "Cache file should exist");
    }

    #[test]
    fn test_write_image_stores_png_next_to_record() {
        let (cache, temp_dir) = create_test_cache();
        let data = TestData {
            name: "board".to_string(),
            value: 3,
        };

        cache.write("board_key", &data, timestamp()).unwrap();
        cache.write_image("board_key", b"\x89PNG first").unwrap();
        cache.write_image("board_key", b"\x89PNG second").unwrap();

        let image_path = temp_dir.path().join("board_key.png");
        assert_eq!(cache.image_path("board_key"), image_path);
        assert_eq!(fs::read(&image_path).unwrap(), b"\x89PNG second");
        // The record itself is untouched by the image
        let result: CachedData<TestData> = cache.read("board_key").unwrap();
        assert_eq!(result.data, data);
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(cache) = CacheManager::new() {
            let path_str = cache.cache_dir().to_string_lossy();
            assert!(
                path_str.contains("gasprice"),
                "Cache path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }

    #[test]
    fn test_overwrite_existing_cache() {
        let (cache, _temp_dir) = create_test_cache();
        let data1 = TestData {
            name: "first".to_string(),
            value: 1,
        };
        let data2 = TestData {
            name: "second".to_string(),
            value: 2,
        };
        let later = timestamp() + chrono::Duration::minutes(5);

        cache.write("overwrite_key", &data1, timestamp()).unwrap();
        cache.write("overwrite_key", &data2, later).unwrap();

        let result: CachedData<TestData> = cache.read("overwrite_key").expect("Should read cache");

        assert_eq!(result.data, data2, "Cache should contain latest data");
        assert_eq!(result.stored_at, later);
    }
}
