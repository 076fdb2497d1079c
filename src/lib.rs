//! Dutch fuel station prices
//!
//! Resolves per-liter prices for a station by fetching its published
//! price-board image, recognizing the text on it and repairing the noisy
//! numbers into a structured record. Records are cached per station for a
//! bounded freshness window.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod fetch;
pub mod logging;
pub mod ocr;
pub mod resolver;
