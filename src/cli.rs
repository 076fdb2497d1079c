//! Command-line interface parsing for gasprice
//!
//! This module handles parsing of CLI arguments using clap and merges them
//! over the settings loaded from defaults and an optional config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Settings, SettingsError};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The config file could not be loaded
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Dutch fuel prices read from station price boards
#[derive(Parser, Debug)]
#[command(name = "gasprice")]
#[command(about = "Dutch fuel station prices recognized from price-board images")]
#[command(version)]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "GASPRICE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for cached station records
    #[arg(long, global = true, env = "GASPRICE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Resolve prices for one or more stations and print them as JSON
    ///
    /// Examples:
    ///   gasprice lookup 12345
    ///   gasprice lookup 12345 --fuel diesel
    ///   gasprice lookup 12345 67890
    Lookup {
        /// Station ids (the number before .png in the board URL)
        #[arg(required = true, num_args = 1..)]
        station_ids: Vec<String>,

        /// Only report the price of this fuel kind
        ///
        /// Valid fuel kinds: euro95, euro98, diesel, lpg
        #[arg(long, value_name = "FUEL")]
        fuel: Option<String>,
    },
}

impl Cli {
    /// Builds the effective settings: defaults, then config file, then flags.
    pub fn settings(&self) -> Result<Settings, CliError> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };

        if let Some(cache_dir) = &self.cache_dir {
            settings.cache_dir = Some(cache_dir.clone());
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                settings.host = host.clone();
            }
            if let Some(port) = port {
                settings.port = *port;
            }
        }

        Ok(settings)
    }
}
