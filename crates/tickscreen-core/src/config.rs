//! # Configuration
//!
//! Two inputs drive a run:
//!
//! | Input | Shape |
//! |-------|-------|
//! | [`CompanySource`] | a watchlist file (`company:` list) or an explicit list of names |
//! | [`ScreenConfig`] | run settings; every field has a default |
//!
//! Both are YAML (JSON parses too) and resolved once, before any fetch.
//!
//! ```yaml
//! exchange_suffix: .NS
//! company:
//!   - INFY
//!   - TCS
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ema_signal::EmaPeriods;
use crate::indicator::DEFAULT_SMOOTHING;
use crate::pool::WorkerPool;
use crate::ranker::DEFAULT_TOP_COMPANY_COUNT;
use crate::volume::DEFAULT_VOLUME_WINDOW_DAYS;
use crate::{Company, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("watchlist is empty")]
    EmptyWatchlist,

    #[error("invalid company '{name}': {source}")]
    InvalidCompany {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Where the watchlist comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanySource {
    /// YAML/JSON file with a `company:` list and optional `exchange_suffix`.
    ByFile(PathBuf),
    /// Company names given directly.
    ByList(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct WatchlistFile {
    company: Vec<String>,
    #[serde(default)]
    exchange_suffix: Option<String>,
}

impl CompanySource {
    /// Resolves the source into companies, in listed order.
    ///
    /// `exchange_suffix` overrides the suffix declared in a watchlist file.
    /// Duplicate names are kept as given.
    pub fn resolve(&self, exchange_suffix: Option<&str>) -> Result<Vec<Company>, ConfigError> {
        let (names, suffix) = match self {
            Self::ByFile(path) => {
                let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                let file: WatchlistFile =
                    serde_yaml::from_str(&body).map_err(|source| ConfigError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                let suffix = exchange_suffix.map(str::to_owned).or(file.exchange_suffix);
                (file.company, suffix)
            }
            Self::ByList(names) => (names.clone(), exchange_suffix.map(str::to_owned)),
        };

        if names.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }

        names
            .iter()
            .map(|name| {
                Company::new(name, suffix.as_deref()).map_err(|source| {
                    ConfigError::InvalidCompany {
                        name: name.clone(),
                        source,
                    }
                })
            })
            .collect()
    }
}

/// Run settings shared by every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub top_company_count: usize,
    pub ema_periods: EmaPeriods,
    pub smoothing: f64,
    /// `None` sizes the pool from the available parallelism.
    pub worker_count: Option<usize>,
    pub fetch_timeout_ms: u64,
    pub export_path: PathBuf,
    pub volume_window_days: u32,
    /// Appended to every company name to form the provider ticker.
    pub exchange_suffix: Option<String>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            top_company_count: DEFAULT_TOP_COMPANY_COUNT,
            ema_periods: EmaPeriods::default(),
            smoothing: DEFAULT_SMOOTHING,
            worker_count: None,
            fetch_timeout_ms: 30_000,
            export_path: PathBuf::from("."),
            volume_window_days: DEFAULT_VOLUME_WINDOW_DAYS,
            exchange_suffix: None,
        }
    }
}

impl ScreenConfig {
    /// Loads settings from a YAML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&body).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_company_count == 0 {
            return Err(invalid("top_company_count", "must be at least 1"));
        }
        if self.ema_periods.short == 0 || self.ema_periods.long == 0 {
            return Err(invalid("ema_periods", "periods must be greater than zero"));
        }
        if !self.smoothing.is_finite() || self.smoothing <= 0.0 {
            return Err(invalid("smoothing", "must be a positive number"));
        }
        if self.worker_count == Some(0) {
            return Err(invalid("worker_count", "must be at least 1"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(invalid("fetch_timeout_ms", "must be greater than zero"));
        }
        if self.volume_window_days == 0 {
            return Err(invalid("volume_window_days", "must be at least 1"));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn worker_pool(&self) -> WorkerPool {
        self.worker_count
            .map(WorkerPool::new)
            .unwrap_or_else(WorkerPool::from_available_parallelism)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field,
        reason: reason.to_owned(),
    }
}
