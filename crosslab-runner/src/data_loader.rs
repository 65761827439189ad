//! Price and signal loading for the runner.
//!
//! Resolves the bars for one symbol with this fallback policy:
//! 1. If a CSV path is given → read it, nothing else
//! 2. Local store, topped up from the provider unless offline
//! 3. If still nothing and `synthetic` → generate synthetic bars (tagged)
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data carry `has_synthetic = true`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use crosslab_core::data::{fetch_prices, DataError, DataSource, PriceProvider, PriceStore, RawBar};
use crosslab_core::domain::table::{CLOSE, POSITION_CHANGE};
use crosslab_core::domain::{PriceBar, SignalTable};
use crosslab_core::InvalidInputError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no stored data for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NoStoredDataOffline { symbol: String },

    #[error("failed to read CSV {}: {reason}", .path.display())]
    Csv { path: PathBuf, reason: String },

    #[error("CSV {} has no '{column}' column", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("CSV {}, line {line}: {reason}", .path.display())]
    BadRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("CSV {} has no rows between {start} and {end}", .path.display())]
    EmptyCsv {
        path: PathBuf,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("invalid signal series: {0}")]
    Signals(#[from] InvalidInputError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start date for bars (inclusive).
    pub start: NaiveDate,
    /// End date for bars (inclusive).
    pub end: NaiveDate,
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Read this CSV instead of the store.
    pub csv_path: Option<PathBuf>,
}

/// Bars for one symbol, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub symbol: String,
    pub company_name: Option<String>,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
    pub has_synthetic: bool,
    /// BLAKE3 over every bar.
    pub dataset_hash: String,
}

impl LoadedPrices {
    fn new(
        symbol: &str,
        company_name: Option<String>,
        bars: Vec<RawBar>,
        source: DataSource,
    ) -> Self {
        let dataset_hash = compute_dataset_hash(symbol, &bars);
        Self {
            symbol: symbol.to_string(),
            company_name,
            has_synthetic: source == DataSource::Synthetic,
            bars,
            source,
            dataset_hash,
        }
    }

    pub fn price_bars(&self) -> Vec<PriceBar> {
        self.bars.iter().map(RawBar::to_price_bar).collect()
    }
}

/// Load bars for `symbol` following the fallback policy above.
pub fn load_prices(
    symbol: &str,
    store: &PriceStore,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
) -> Result<LoadedPrices, LoadError> {
    // Step 1: explicit CSV
    if let Some(path) = &opts.csv_path {
        let bars = load_csv_prices(path, opts.start, opts.end)?;
        info!(symbol, path = %path.display(), bars = bars.len(), "loaded prices from CSV");
        return Ok(LoadedPrices::new(symbol, None, bars, DataSource::CsvImport));
    }

    // Step 2: store, topped up from the provider
    let provider = if opts.offline { None } else { provider };
    let failure = match fetch_prices(store, provider, symbol, opts.start, opts.end) {
        Ok(history) => {
            if let Some(reason) = &history.remote_error {
                warn!(symbol, %reason, "download failed, using stored data only");
            }
            info!(
                symbol,
                source = %history.source,
                bars = history.len(),
                "loaded prices"
            );
            return Ok(LoadedPrices::new(
                symbol,
                history.company_name,
                history.bars,
                history.source,
            ));
        }
        Err(e) => e,
    };

    // Step 3: synthetic fallback
    if opts.synthetic {
        warn!(
            symbol,
            reason = %failure,
            "generating synthetic data, results will be tagged as synthetic"
        );
        let bars = generate_synthetic_bars(symbol, opts.start, opts.end);
        return Ok(LoadedPrices::new(symbol, None, bars, DataSource::Synthetic));
    }

    // Step 4: fail
    match failure {
        DataError::NoData { .. } if opts.offline => Err(LoadError::NoStoredDataOffline {
            symbol: symbol.to_string(),
        }),
        e => Err(LoadError::Data(e)),
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

/// Header name → column index, matched case-insensitively.
fn header_index(
    path: &Path,
    reader: &mut csv::Reader<std::fs::File>,
) -> Result<HashMap<String, usize>, LoadError> {
    let headers = reader.headers().map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect())
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn require_column(
    path: &Path,
    columns: &HashMap<String, usize>,
    name: &str,
) -> Result<usize, LoadError> {
    columns
        .get(name)
        .copied()
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn parse_date(
    path: &Path,
    record: &csv::StringRecord,
    idx: usize,
) -> Result<NaiveDate, LoadError> {
    let raw = record.get(idx).unwrap_or("");
    // Accept timestamps like "2024-01-02 00:00:00" by reading the date part.
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|e| LoadError::BadRow {
        path: path.to_path_buf(),
        line: line_of(record),
        reason: format!("bad date '{raw}': {e}"),
    })
}

fn parse_number(
    path: &Path,
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
) -> Result<f64, LoadError> {
    let raw = record.get(idx).unwrap_or("");
    raw.parse::<f64>().map_err(|e| LoadError::BadRow {
        path: path.to_path_buf(),
        line: line_of(record),
        reason: format!("bad {column} '{raw}': {e}"),
    })
}

/// Read daily bars from a CSV with at least `date` and `close` columns.
///
/// `open`, `high`, `low` and `volume` are used when present; other columns
/// are ignored. Rows outside `[start, end]` are dropped, the rest are sorted
/// by date with later duplicates winning.
pub fn load_csv_prices(
    path: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawBar>, LoadError> {
    let mut reader = open_csv(path)?;
    let columns = header_index(path, &mut reader)?;
    let date_idx = require_column(path, &columns, "date")?;
    let close_idx = require_column(path, &columns, CLOSE)?;
    let optional = |name: &str| columns.get(name).copied();
    let (open_idx, high_idx, low_idx, volume_idx) = (
        optional("open"),
        optional("high"),
        optional("low"),
        optional("volume"),
    );

    let mut by_date = std::collections::BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let date = parse_date(path, &record, date_idx)?;
        if date < start || date > end {
            continue;
        }
        let close = parse_number(path, &record, close_idx, CLOSE)?;
        let or_close = |idx: Option<usize>, name: &str| -> Result<f64, LoadError> {
            match idx {
                Some(i) if !record.get(i).unwrap_or("").is_empty() => {
                    parse_number(path, &record, i, name)
                }
                _ => Ok(close),
            }
        };
        let volume = match volume_idx {
            Some(i) if !record.get(i).unwrap_or("").is_empty() => {
                parse_number(path, &record, i, "volume")?.max(0.0) as u64
            }
            _ => 0,
        };

        by_date.insert(
            date,
            RawBar {
                date,
                open: or_close(open_idx, "open")?,
                high: or_close(high_idx, "high")?,
                low: or_close(low_idx, "low")?,
                close,
                volume,
            },
        );
    }

    if by_date.is_empty() {
        return Err(LoadError::EmptyCsv {
            path: path.to_path_buf(),
            start,
            end,
        });
    }
    Ok(by_date.into_values().collect())
}

/// Read a precomputed signal series into a [`SignalTable`].
///
/// Needs `date`, `close` and `position_change` columns, which must be
/// numeric. Any other column is kept when every non-empty cell parses as a
/// number (empty cells become NaN) and skipped otherwise, so text columns
/// such as headlines do not fail the load. Row order is kept as written, the
/// engine rejects unordered dates.
pub fn load_signal_csv(path: &Path) -> Result<SignalTable, LoadError> {
    let mut reader = open_csv(path)?;
    let columns = header_index(path, &mut reader)?;
    let date_idx = require_column(path, &columns, "date")?;
    require_column(path, &columns, CLOSE)?;
    require_column(path, &columns, POSITION_CHANGE)?;

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut value_columns: Vec<(&str, usize)> = columns
        .iter()
        .filter(|&(_, &i)| i != date_idx)
        .map(|(name, &i)| (name.as_str(), i))
        .filter(|&(name, i)| {
            name == CLOSE || name == POSITION_CHANGE || is_numeric_column(&records, i)
        })
        .collect();
    value_columns.sort_by_key(|&(_, i)| i);

    let dates = records
        .iter()
        .map(|record| parse_date(path, record, date_idx))
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = SignalTable::new(dates);
    for (name, idx) in value_columns {
        let values = records
            .iter()
            .map(|record| match record.get(idx).unwrap_or("") {
                "" => Ok(f64::NAN),
                _ => parse_number(path, record, idx, name),
            })
            .collect::<Result<Vec<_>, _>>()?;
        table.insert_column(name, values)?;
    }
    Ok(table)
}

/// True when every non-empty cell in column `idx` parses as a number.
fn is_numeric_column(records: &[csv::StringRecord], idx: usize) -> bool {
    records.iter().all(|record| match record.get(idx).unwrap_or("") {
        "" => true,
        cell => cell.parse::<f64>().is_ok(),
    })
}

// ── Hashing and synthetic data ───────────────────────────────────────

/// Deterministic BLAKE3 hash over the symbol and every bar value.
fn compute_dataset_hash(symbol: &str, bars: &[RawBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic bars for testing/development.
///
/// A random walk from 100.0 seeded by the symbol name, weekdays only.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;

    for current in start.iter_days().take_while(|d| *d <= end) {
        if matches!(current.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }

    bars
}
