//! Runtime configuration from environment variables

use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    /// Directory holding countries.json, time_series.json and predictions.csv
    pub data_dir: PathBuf,
    /// ISO code selected at startup and after a reset
    pub default_country: String,
    /// Simulated store latency for the file source
    pub fetch_latency: Duration,
    pub log_file: PathBuf,
    pub rust_log: String,
}

impl AtlasConfig {
    /// Environment variables:
    /// - `GDP_ATLAS_DATA_DIR` (default: data)
    /// - `GDP_ATLAS_DEFAULT_COUNTRY` (default: USA)
    /// - `GDP_ATLAS_FETCH_LATENCY_MS` (default: 0)
    /// - `GDP_ATLAS_LOG_FILE` (default: gdp_atlas.log)
    /// - `RUST_LOG` (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_country = lookup("GDP_ATLAS_DEFAULT_COUNTRY")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| "USA".to_string());
        if default_country.is_empty() {
            return Err(ConfigError::InvalidValue(
                "GDP_ATLAS_DEFAULT_COUNTRY cannot be empty".to_string(),
            ));
        }

        let fetch_latency = match lookup("GDP_ATLAS_FETCH_LATENCY_MS") {
            Some(raw) => raw.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "GDP_ATLAS_FETCH_LATENCY_MS must be a whole number of milliseconds, got '{}'",
                    raw
                ))
            })?,
            None => Duration::ZERO,
        };

        Ok(Self {
            data_dir: lookup("GDP_ATLAS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            default_country,
            fetch_latency,
            log_file: lookup("GDP_ATLAS_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("gdp_atlas.log")),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
