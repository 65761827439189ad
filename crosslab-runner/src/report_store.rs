//! Report history: JSONL append-only persistence of run summaries.
//!
//! One JSON object per line, oldest first on disk. Readers get newest first.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crosslab_core::data::DataSource;
use crosslab_core::domain::StatsBundle;

use crate::config::RunId;
use crate::runner::BacktestResult;

/// Default location of the report history.
pub const DEFAULT_REPORT_FILE: &str = "reports/history.jsonl";

/// A single report: run identity, parameters and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub run_id: RunId,
    pub symbol: String,
    pub company_name: Option<String>,
    pub run_timestamp: NaiveDateTime,
    pub short_window: Option<usize>,
    pub long_window: Option<usize>,
    pub data_source: DataSource,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub stats: StatsBundle,
}

impl ReportEntry {
    /// Snapshot a result, stamped with the current UTC time.
    pub fn from_result(result: &BacktestResult) -> Self {
        Self::from_result_at(result, Utc::now().naive_utc())
    }

    pub fn from_result_at(result: &BacktestResult, run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id: result.run_id.clone(),
            symbol: result.symbol.clone(),
            company_name: result.company_name.clone(),
            run_timestamp,
            short_window: result.short_window,
            long_window: result.long_window,
            data_source: result.data_source,
            has_synthetic: result.has_synthetic,
            bar_count: result.bar_count,
            stats: result.stats,
        }
    }
}

/// JSONL report file manager.
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one entry, creating the file and its directory if needed.
    pub fn append(&self, entry: &ReportEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{json}")?;
        file.flush()
    }

    /// Every entry, newest first.
    ///
    /// Malformed lines are logged and skipped. A missing file is empty.
    pub fn read_all(&self) -> io::Result<Vec<ReportEntry>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for (i, line) in io::BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ReportEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = i + 1,
                    error = %e,
                    "skipping malformed report line"
                ),
            }
        }

        entries.reverse();
        Ok(entries)
    }

    /// At most `n` entries, newest first.
    pub fn latest(&self, n: usize) -> io::Result<Vec<ReportEntry>> {
        let mut entries = self.read_all()?;
        entries.truncate(n);
        Ok(entries)
    }

    /// Most recent entry with this run id.
    pub fn find(&self, run_id: &str) -> io::Result<Option<ReportEntry>> {
        Ok(self.read_all()?.into_iter().find(|e| e.run_id == run_id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
