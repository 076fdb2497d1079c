//! Runtime settings
//!
//! Settings come from built-in defaults, optionally overlaid by a TOML file,
//! and finally by command-line flags.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::DEFAULT_FRESHNESS_WINDOW;
use crate::data::extract::{PLAUSIBLE_MAX_PRICE, SUPERSCRIPT_TOKEN_LEN};
use crate::data::RepairRules;
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, DEFAULT_IMAGE_BASE_URL};
use crate::ocr::DEFAULT_OCR_TIMEOUT;

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for these settings
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Service settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP API binds to
    pub host: String,
    /// Port the HTTP API listens on
    pub port: u16,
    /// Default log level (`trace`, `debug`, `info`, `warn`, `error`)
    pub log_level: String,
    /// Directory holding cached station records; XDG cache dir when unset
    pub cache_dir: Option<PathBuf>,
    /// Seconds a cached record is served before it is refreshed
    pub freshness_secs: u64,
    /// Seconds before an image request is abandoned
    pub fetch_timeout_secs: u64,
    /// Seconds before a recognition run is abandoned
    pub ocr_timeout_secs: u64,
    /// Base URL of the price-board image service
    pub image_base_url: String,
    /// Name or path of the tesseract binary
    pub tesseract_command: String,
    /// Tesseract language model, engine default when unset
    pub tesseract_language: Option<String>,
    /// Stripped token length that marks a merged superscript digit
    pub superscript_len: usize,
    /// Highest price accepted without decimal repair
    pub plausible_max: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            cache_dir: None,
            freshness_secs: DEFAULT_FRESHNESS_WINDOW.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            ocr_timeout_secs: DEFAULT_OCR_TIMEOUT.as_secs(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            tesseract_command: "tesseract".to_string(),
            tesseract_language: None,
            superscript_len: SUPERSCRIPT_TOKEN_LEN,
            plausible_max: PLAUSIBLE_MAX_PRICE,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn repair_rules(&self) -> RepairRules {
        RepairRules {
            superscript_len: self.superscript_len,
            plausible_max: self.plausible_max,
        }
    }
}
