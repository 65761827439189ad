//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over remote price sources so the
//! local-first fetch policy can be exercised against a mock in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceBar;

/// Daily OHLCV bar as delivered by a provider or read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl RawBar {
    pub fn to_price_bar(&self) -> PriceBar {
        PriceBar {
            date: self.date,
            close: self.close,
        }
    }
}

/// Structured error types for data operations.
///
/// Displayable as-is in the CLI.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no price data for '{symbol}' between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful remote fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    /// Long company name when the provider reports one.
    pub company_name: Option<String>,
    pub bars: Vec<RawBar>,
}

/// Where a price history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Served entirely from the local store.
    Store,
    /// Store topped up from the remote provider.
    Remote,
    CsvImport,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataSource::Store => "store",
            DataSource::Remote => "remote",
            DataSource::CsvImport => "csv",
            DataSource::Synthetic => "synthetic",
        };
        f.write_str(s)
    }
}

/// Remote source of daily bars.
///
/// Implementations only fetch. Persistence is the store's job.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over an inclusive date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Whether the provider is worth calling right now.
    fn is_available(&self) -> bool {
        true
    }
}
