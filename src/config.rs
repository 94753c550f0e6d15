//! Configuration management and validation.
//!
//! Filter settings can come from a TOML file and from command-line flags.
//! Flags override the file one axis at a time. Every range is validated
//! through the [`FilterConfig`] setters when the engine configuration is
//! built.
//!
//! ```toml
//! [filters]
//! name = "Hall2"
//! obscode = "706"
//! time = ["1999-06-04", 51335.0]
//! ra = [17.0, 21.0]
//! dec = [-25.5, -15.0]
//! magnitude = [14.0, 18.0]
//!
//! [processing]
//! workers = 8
//! chunk_size = 16384
//! ```

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_CONFIG_FILE, default_workers};
use crate::error::{ConfigError, MpcError, Result};
use crate::filter::FilterConfig;
use crate::models::Mjd;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub filters: FilterSettings,
    pub processing: ProcessingSettings,
}

/// Unvalidated filter axes as written in a config file or on the command line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    pub name: Option<String>,
    pub obscode: Option<String>,
    pub time: Option<[TimeBound; 2]>,
    pub ra: Option<[f64; 2]>,
    pub dec: Option<[f64; 2]>,
    pub magnitude: Option<[f64; 2]>,
}

/// Concurrency settings for the parallel filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingSettings {
    /// Number of blocking tasks evaluating chunks concurrently
    pub workers: usize,

    /// Lines per chunk
    pub chunk_size: usize,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A time bound given either as an MJD number or as an ISO-8601 UTC date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    Mjd(f64),
    Date(String),
}

impl TimeBound {
    /// Resolve to an MJD value
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]` and the same with a
    /// space instead of `T`.
    pub fn to_mjd(&self) -> std::result::Result<f64, ConfigError> {
        match self {
            TimeBound::Mjd(value) => Ok(*value),
            TimeBound::Date(text) => parse_date(text.trim())
                .map(|mjd| mjd.value())
                .ok_or_else(|| ConfigError::InvalidTimeBound {
                    value: text.clone(),
                }),
        }
    }
}

impl FromStr for TimeBound {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(value) = s.trim().parse::<f64>() {
            return Ok(TimeBound::Mjd(value));
        }
        let bound = TimeBound::Date(s.to_string());
        bound.to_mjd()?;
        Ok(bound)
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBound::Mjd(value) => write!(f, "{value}"),
            TimeBound::Date(text) => f.write_str(text),
        }
    }
}

fn parse_date(text: &str) -> Option<Mjd> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Mjd::from_naive_date(date));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(Mjd::from_naive_datetime)
}

impl FilterSettings {
    /// Overlay `overrides` onto these settings, axis by axis
    ///
    /// RA and Dec are replaced together when either is overridden.
    pub fn merge(&mut self, overrides: FilterSettings) {
        if overrides.name.is_some() {
            self.name = overrides.name;
        }
        if overrides.obscode.is_some() {
            self.obscode = overrides.obscode;
        }
        if overrides.time.is_some() {
            self.time = overrides.time;
        }
        if overrides.ra.is_some() || overrides.dec.is_some() {
            self.ra = overrides.ra;
            self.dec = overrides.dec;
        }
        if overrides.magnitude.is_some() {
            self.magnitude = overrides.magnitude;
        }
    }

    /// Validate every axis and build the engine configuration
    pub fn to_filter_config(&self) -> std::result::Result<FilterConfig, ConfigError> {
        let mut config = FilterConfig::new();

        if let Some(name) = &self.name {
            config.set_name(name.trim());
        }
        if let Some(obscode) = &self.obscode {
            config.set_obscode(obscode.clone());
        }
        if let Some([start, end]) = &self.time {
            config.set_time_range(start.to_mjd()?, end.to_mjd()?)?;
        }
        match (self.ra, self.dec) {
            (Some([ra_min, ra_max]), Some([dec_min, dec_max])) => {
                config.set_sky_window(ra_min, ra_max, dec_min, dec_max)?;
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteSkyWindow),
        }
        if let Some([min, max]) = self.magnitude {
            config.set_magnitude_range(min, max)?;
        }

        Ok(config)
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| MpcError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text).map_err(|e| MpcError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load an explicit config file, or `mpc-filter.toml` from the working
    /// directory when present, or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Self::default_config_path();
                if default_path.is_file() {
                    Self::load(&default_path)
                } else {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Replace the filter axes given in `overrides`
    pub fn with_filter_overrides(mut self, overrides: FilterSettings) -> Self {
        self.filters.merge(overrides);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.processing.workers = workers;
        self
    }

    pub fn filter_config(&self) -> Result<FilterConfig> {
        Ok(self.filters.to_filter_config()?)
    }

    /// Check every setting without building anything
    pub fn validate(&self) -> Result<()> {
        self.filter_config()?;
        if self.processing.workers == 0 {
            return Err(ConfigError::ZeroSetting { name: "workers" }.into());
        }
        if self.processing.chunk_size == 0 {
            return Err(ConfigError::ZeroSetting { name: "chunk_size" }.into());
        }
        Ok(())
    }
}
