//! Backtest runner: wires together data loading, signals and the engine.
//!
//! Entry points:
//! - `run_single_backtest()`: loads prices from the store, then runs. Used by CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded prices, logs through `tracing`.
//! - `run_backtest_from_signals()`: takes a precomputed signal table.
//! - `run_backtest_observed()`: pre-loaded prices with a caller-supplied observer. Used by the sweep.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crosslab_core::data::{DataSource, PriceProvider, PriceStore};
use crosslab_core::domain::table::{CLOSE, POSITION_CHANGE};
use crosslab_core::domain::{PortfolioSeries, SignalTable, StatsBundle, Trade};
use crosslab_core::engine::{run_backtest_table, BacktestObserver, BacktestOutcome};
use crosslab_core::signals::{SignalError, SmaCrossover};
use crosslab_core::{DegenerateInput, InvalidInputError};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_prices, LoadError, LoadedPrices};
use crate::observer::TracingObserver;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Signal(#[from] SignalError),
    #[error("engine rejected input: {0}")]
    Engine(#[from] InvalidInputError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub company_name: Option<String>,
    /// `None` when the signals were supplied rather than generated.
    pub short_window: Option<usize>,
    pub long_window: Option<usize>,
    /// First and last simulated bar.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub data_source: DataSource,
    pub has_synthetic: bool,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub stats: StatsBundle,
    pub trades: Vec<Trade>,
    pub portfolio: PortfolioSeries,
    pub degenerate: Option<DegenerateInput>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn is_degenerate(&self) -> bool {
        self.degenerate.is_some()
    }
}

/// Run a single backtest from a `BacktestConfig` (loads prices from the store).
pub fn run_single_backtest(
    config: &BacktestConfig,
    store: &PriceStore,
    provider: Option<&dyn PriceProvider>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_prices(
        &config.backtest.symbol,
        store,
        provider,
        &config.load_options(),
    )?;
    run_backtest_from_bars(config, &loaded)
}

/// Run a backtest with pre-loaded prices. No I/O.
///
/// Progress is reported through `tracing`.
pub fn run_backtest_from_bars(
    config: &BacktestConfig,
    loaded: &LoadedPrices,
) -> Result<BacktestResult, RunError> {
    let observer = TracingObserver::new(&config.backtest.symbol);
    run_backtest_observed(config, loaded, &observer)
}

/// [`run_backtest_from_bars`] with a caller-supplied observer.
pub fn run_backtest_observed(
    config: &BacktestConfig,
    loaded: &LoadedPrices,
    observer: &dyn BacktestObserver,
) -> Result<BacktestResult, RunError> {
    let strategy = config.crossover()?;
    let table = strategy.generate(&loaded.price_bars());
    let outcome = run_backtest_table(&table, config.backtest.initial_capital, observer)?;

    Ok(assemble(
        outcome,
        Provenance {
            run_id: config.run_id(&loaded.dataset_hash),
            symbol: loaded.symbol.clone(),
            company_name: loaded.company_name.clone(),
            strategy: Some(strategy),
            data_source: loaded.source,
            has_synthetic: loaded.has_synthetic,
            dataset_hash: loaded.dataset_hash.clone(),
        },
    ))
}

/// Run a backtest over a precomputed signal table.
///
/// The table must carry `close` and `position_change` columns; any other
/// columns are ignored.
pub fn run_backtest_from_signals(
    symbol: &str,
    table: &SignalTable,
    initial_capital: f64,
) -> Result<BacktestResult, RunError> {
    let observer = TracingObserver::new(symbol);
    let outcome = run_backtest_table(table, initial_capital, &observer)?;
    let dataset_hash = signal_table_hash(table)?;

    let canonical = serde_json::json!({
        "symbol": symbol,
        "initial_capital": initial_capital,
        "signals": dataset_hash,
    });
    let run_id = blake3::hash(canonical.to_string().as_bytes())
        .to_hex()
        .to_string();

    Ok(assemble(
        outcome,
        Provenance {
            run_id,
            symbol: symbol.to_string(),
            company_name: None,
            strategy: None,
            data_source: DataSource::CsvImport,
            has_synthetic: false,
            dataset_hash,
        },
    ))
}

struct Provenance {
    run_id: RunId,
    symbol: String,
    company_name: Option<String>,
    strategy: Option<SmaCrossover>,
    data_source: DataSource,
    has_synthetic: bool,
    dataset_hash: String,
}

fn assemble(outcome: BacktestOutcome, p: Provenance) -> BacktestResult {
    let rows = outcome.portfolio.rows();
    let start_date = rows.first().map(|r| r.date);
    let end_date = rows.last().map(|r| r.date);
    let bar_count = rows.len();
    BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: p.run_id,
        symbol: p.symbol,
        company_name: p.company_name,
        short_window: p.strategy.as_ref().map(SmaCrossover::short_window),
        long_window: p.strategy.as_ref().map(SmaCrossover::long_window),
        start_date,
        end_date,
        data_source: p.data_source,
        has_synthetic: p.has_synthetic,
        dataset_hash: p.dataset_hash,
        bar_count,
        stats: outcome.stats,
        trades: outcome.trades,
        portfolio: outcome.portfolio,
        degenerate: outcome.degenerate,
    }
}

fn signal_table_hash(table: &SignalTable) -> Result<String, InvalidInputError> {
    let closes = table.require(CLOSE)?;
    let changes = table.require(POSITION_CHANGE)?;
    let mut hasher = blake3::Hasher::new();
    for ((date, close), change) in table.dates().iter().zip(closes).zip(changes) {
        hasher.update(date.to_string().as_bytes());
        hasher.update(&close.to_le_bytes());
        hasher.update(&change.to_le_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslab_core::data::RawBar;
    use crosslab_core::engine::NoopObserver;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn loaded(closes: &[f64]) -> LoadedPrices {
        let start = d(2024, 1, 1);
        let bars: Vec<RawBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| RawBar {
                date: start + chrono::Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 0,
            })
            .collect();
        LoadedPrices {
            symbol: "TEST".into(),
            company_name: Some("Test Corp".into()),
            bars,
            source: DataSource::Store,
            has_synthetic: false,
            dataset_hash: "abc".into(),
        }
    }

    fn config(short: usize, long: usize) -> BacktestConfig {
        let mut c = BacktestConfig::new("TEST", d(2024, 1, 1), d(2024, 12, 31));
        c.backtest.initial_capital = 1_000.0;
        c.strategy.short_window = short;
        c.strategy.long_window = long;
        c
    }

    #[test]
    fn result_carries_provenance() {
        let prices = [10.0, 9.0, 8.0, 9.0, 11.0, 13.0, 12.0, 10.0, 8.0, 7.0];
        let result = run_backtest_observed(&config(2, 4), &loaded(&prices), &NoopObserver).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.symbol, "TEST");
        assert_eq!(result.company_name.as_deref(), Some("Test Corp"));
        assert_eq!(result.short_window, Some(2));
        assert_eq!(result.long_window, Some(4));
        assert_eq!(result.bar_count, prices.len());
        assert_eq!(result.start_date, Some(d(2024, 1, 1)));
        assert_eq!(result.end_date, Some(d(2024, 1, 10)));
        assert_eq!(result.run_id, config(2, 4).run_id("abc"));
        assert_eq!(result.stats.initial_capital, 1_000.0);
        assert!(!result.is_degenerate());
    }

    #[test]
    fn run_id_follows_the_data() {
        let prices = [10.0, 9.0, 8.0, 9.0, 11.0, 13.0];
        let before = loaded(&prices);
        let mut after = loaded(&prices);
        after.dataset_hash = "topped-up".into();

        let a = run_backtest_observed(&config(2, 4), &before, &NoopObserver).unwrap();
        let b = run_backtest_observed(&config(2, 4), &after, &NoopObserver).unwrap();
        let again = run_backtest_observed(&config(2, 4), &before, &NoopObserver).unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.run_id, again.run_id);
    }

    #[test]
    fn no_bars_is_degenerate_not_an_error() {
        let result = run_backtest_observed(&config(2, 4), &loaded(&[]), &NoopObserver).unwrap();
        assert_eq!(result.degenerate, Some(DegenerateInput::EmptySeries));
        assert_eq!(result.stats, StatsBundle::neutral(1_000.0));
        assert_eq!(result.start_date, None);
        assert_eq!(result.bar_count, 0);
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let err = run_backtest_from_bars(&config(5, 5), &loaded(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(err, RunError::Signal(_)));
    }

    #[test]
    fn signals_run_uses_supplied_changes() {
        let dates: Vec<NaiveDate> = (0..4).map(|i| d(2024, 2, 1 + i)).collect();
        let table = SignalTable::new(dates)
            .with_column(CLOSE, vec![100.0, 110.0, 120.0, 130.0])
            .unwrap()
            .with_column(POSITION_CHANGE, vec![0.0, 1.0, 0.0, -1.0])
            .unwrap();

        let result = run_backtest_from_signals("SIG", &table, 1_000.0).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.short_window, None);
        assert_eq!(result.data_source, DataSource::CsvImport);
        assert!((result.stats.final_value - 1_020.0).abs() < 1e-9);

        let again = run_backtest_from_signals("SIG", &table, 1_000.0).unwrap();
        assert_eq!(result.run_id, again.run_id);
        let other = run_backtest_from_signals("SIG", &table, 2_000.0).unwrap();
        assert_ne!(result.run_id, other.run_id);
    }

    #[test]
    fn signals_without_position_change_are_rejected() {
        let table = SignalTable::new(vec![d(2024, 2, 1)])
            .with_column(CLOSE, vec![1.0])
            .unwrap();
        let err = run_backtest_from_signals("SIG", &table, 1_000.0).unwrap_err();
        assert!(matches!(err, RunError::Engine(_)));
    }
}
