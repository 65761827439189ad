//! Serializable backtest configuration.
//!
//! ```toml
//! [backtest]
//! symbol = "AAPL"
//! start_date = "2020-01-01"
//! end_date = "2024-12-31"
//! initial_capital = 100000.0
//!
//! [strategy]
//! short_window = 40
//! long_window = 100
//!
//! [data]
//! store_dir = "data"
//! offline = false
//! synthetic = false
//! # csv_path = "prices/aapl.csv"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crosslab_core::signals::{SignalError, SmaCrossover};

use crate::data_loader::LoadOptions;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_SHORT_WINDOW: usize = 40;
pub const DEFAULT_LONG_WINDOW: usize = 100;
pub const DEFAULT_STORE_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy: {0}")]
    Strategy(#[from] SignalError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reproduce one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub data: DataSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Never touch the network.
    #[serde(default)]
    pub offline: bool,
    /// Fall back to generated bars when no real data is available.
    #[serde(default)]
    pub synthetic: bool,
    /// Read prices from this CSV instead of the store.
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            offline: false,
            synthetic: false,
            csv_path: None,
        }
    }
}

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

fn default_short_window() -> usize {
    DEFAULT_SHORT_WINDOW
}

fn default_long_window() -> usize {
    DEFAULT_LONG_WINDOW
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_DIR)
}

/// Canonical ticker form: trimmed and upper-cased, as the store keys it.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

impl BacktestConfig {
    /// Config with default capital, windows and data settings.
    pub fn new(symbol: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let symbol: String = symbol.into();
        Self {
            backtest: BacktestSection {
                symbol: normalize_symbol(&symbol),
                start_date,
                end_date,
                initial_capital: DEFAULT_INITIAL_CAPITAL,
            },
            strategy: StrategySection::default(),
            data: DataSection::default(),
        }
    }

    /// Read, parse and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(s)?;
        config.backtest.symbol = normalize_symbol(&config.backtest.symbol);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if b.start_date > b.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                b.start_date, b.end_date
            )));
        }
        if !b.initial_capital.is_finite() || b.initial_capital <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_capital must be a positive number, got {}",
                b.initial_capital
            )));
        }
        self.crossover()?;
        Ok(())
    }

    /// The configured crossover strategy.
    pub fn crossover(&self) -> Result<SmaCrossover, SignalError> {
        SmaCrossover::new(self.strategy.short_window, self.strategy.long_window)
    }

    /// Data loading options for this run.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            start: self.backtest.start_date,
            end: self.backtest.end_date,
            offline: self.data.offline,
            synthetic: self.data.synthetic,
            csv_path: self.data.csv_path.clone(),
        }
    }

    /// Deterministic hash of the configured parameters.
    ///
    /// Storage location and network policy are left out: they change where
    /// bars come from, not what the run is. The bars themselves are not
    /// covered, see [`run_id`](Self::run_id).
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.canonical().to_string().as_bytes())
            .to_hex()
            .to_string()
    }

    /// Id of a run of this config over the dataset with hash `dataset_hash`.
    ///
    /// A store top-up changes the dataset hash and so the id, which keeps
    /// artifacts and report history of different data apart.
    pub fn run_id(&self, dataset_hash: &str) -> RunId {
        let canonical = serde_json::json!({
            "config": self.canonical(),
            "dataset_hash": dataset_hash,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }

    fn canonical(&self) -> serde_json::Value {
        serde_json::json!({
            "symbol": self.backtest.symbol,
            "start_date": self.backtest.start_date,
            "end_date": self.backtest.end_date,
            "initial_capital": self.backtest.initial_capital,
            "short_window": self.strategy.short_window,
            "long_window": self.strategy.long_window,
            "synthetic": self.data.synthetic,
            "csv_path": self.data.csv_path,
        })
    }
}
