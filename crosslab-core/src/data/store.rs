//! Local price store: one Parquet file per symbol plus a metadata sidecar.
//!
//! Layout: `{store_dir}/symbol={SYMBOL}/prices.parquet` and `meta.json`.
//!
//! Writes merge new bars into what is already stored (new data wins on a
//! date collision) and land atomically via a `.tmp` file and rename.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::provider::{DataError, RawBar};

const PRICES_FILE: &str = "prices.parquet";
const META_FILE: &str = "meta.json";
const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for a stored symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub symbol: String,
    pub company_name: Option<String>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub bar_count: usize,
    /// BLAKE3 of the stored bars as JSON.
    pub data_hash: String,
    pub updated_at: NaiveDateTime,
}

pub struct PriceStore {
    dir: PathBuf,
}

impl PriceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("symbol={symbol}"))
    }

    fn prices_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(PRICES_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    /// Merge `bars` into the stored series for `symbol`.
    ///
    /// `company_name` replaces the stored name when given. Returns the
    /// metadata written alongside the merged series.
    pub fn merge(
        &self,
        symbol: &str,
        company_name: Option<&str>,
        bars: &[RawBar],
    ) -> Result<StoreMeta, DataError> {
        let previous = self.meta(symbol);

        let mut by_date: BTreeMap<NaiveDate, RawBar> = self
            .load(symbol)?
            .into_iter()
            .map(|b| (b.date, b))
            .collect();
        for bar in bars {
            by_date.insert(bar.date, bar.clone());
        }
        let merged: Vec<RawBar> = by_date.into_values().collect();

        let (Some(first), Some(last)) = (merged.first(), merged.last()) else {
            return Err(DataError::Store(format!("no bars to store for {symbol}")));
        };
        let (first_date, last_date) = (first.date, last.date);

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::Store(format!("failed to create dir: {e}")))?;

        let df = bars_to_dataframe(&merged)?;
        let path = self.prices_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        rename_into_place(&tmp_path, &path)?;

        let data_hash = blake3::hash(
            &serde_json::to_vec(&merged)
                .map_err(|e| DataError::Store(format!("hash serialization: {e}")))?,
        )
        .to_hex()
        .to_string();

        let meta = StoreMeta {
            symbol: symbol.to_string(),
            company_name: company_name
                .map(str::to_string)
                .or_else(|| previous.and_then(|m| m.company_name)),
            first_date,
            last_date,
            bar_count: merged.len(),
            data_hash,
            updated_at: chrono::Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Store(format!("meta serialization: {e}")))?;
        let meta_path = self.meta_path(symbol);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json)
            .map_err(|e| DataError::Store(format!("meta write: {e}")))?;
        rename_into_place(&meta_tmp, &meta_path)?;

        Ok(meta)
    }

    /// All stored bars for `symbol`, ascending by date. Empty when nothing
    /// is stored.
    pub fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError> {
        let path = self.prices_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut bars = read_parquet(&path)?;
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    /// Stored bars with `start <= date <= end`.
    pub fn load_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        Ok(self
            .load(symbol)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }

    /// Date of the most recent stored bar.
    pub fn latest_date(&self, symbol: &str) -> Option<NaiveDate> {
        self.meta(symbol).map(|m| m.last_date)
    }

    /// Sidecar metadata, if the symbol is stored and the sidecar is readable.
    pub fn meta(&self, symbol: &str) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Symbols with a stored series, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, DataError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.dir).map_err(|e| DataError::Store(format!("read dir: {e}")))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Store(format!("dir entry: {e}")))?;
            let name = entry.file_name();
            if let Some(sym) = name.to_str().and_then(|n| n.strip_prefix("symbol=")) {
                if entry.path().join(PRICES_FILE).exists() {
                    symbols.push(sym.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

fn rename_into_place(tmp: &Path, dest: &Path) -> Result<(), DataError> {
    fs::rename(tmp, dest).map_err(|e| {
        let _ = fs::remove_file(tmp);
        DataError::Store(format!("atomic rename failed: {e}"))
    })
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

// NaiveDate::default() is 1970-01-01, the Parquet date epoch.
fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn bars_to_dataframe(bars: &[RawBar]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = bars.iter().map(|b| days_since_epoch(b.date)).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn read_parquet(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::Parquet(format!(
                "{}: missing column '{name}'",
                path.display()
            )));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<RawBar>, DataError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::Parquet(format!("column read: {e}")))
    };
    let type_err = |name: &str, e: PolarsError| DataError::Parquet(format!("{name} column type: {e}"));

    let date_col = col("date")?;
    let open_col = col("open")?;
    let high_col = col("high")?;
    let low_col = col("low")?;
    let close_col = col("close")?;
    let volume_col = col("volume")?;

    let date_ca = date_col.date().map_err(|e| type_err("date", e))?;
    let open_ca = open_col.f64().map_err(|e| type_err("open", e))?;
    let high_ca = high_col.f64().map_err(|e| type_err("high", e))?;
    let low_ca = low_col.f64().map_err(|e| type_err("low", e))?;
    let close_ca = close_col.f64().map_err(|e| type_err("close", e))?;
    let volume_ca = volume_col.u64().map_err(|e| type_err("volume", e))?;

    let epoch = NaiveDate::default();
    let n = df.height();
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null date at row {i}")))?;
        let close = close_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null close at row {i}")))?;

        bars.push(RawBar {
            date: epoch + chrono::Duration::days(days as i64),
            open: open_ca.get(i).unwrap_or(close),
            high: high_ca.get(i).unwrap_or(close),
            low: low_ca.get(i).unwrap_or(close),
            close,
            volume: volume_ca.get(i).unwrap_or(0),
        });
    }

    Ok(bars)
}
