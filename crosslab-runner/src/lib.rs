//! CrossLab Runner: backtest orchestration on top of `crosslab-core`.
//!
//! This crate provides:
//! - TOML configuration with deterministic run ids
//! - Data loading with CSV / store / download / synthetic fallback
//! - Single-backtest runner and parallel window sweeps
//! - JSONL report history
//! - JSON, CSV and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod observer;
pub mod report_store;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{
    generate_synthetic_bars, load_csv_prices, load_prices, load_signal_csv, LoadError,
    LoadOptions, LoadedPrices,
};
pub use export::{generate_report, load_artifacts, save_artifacts};
pub use observer::TracingObserver;
pub use report_store::{ReportEntry, ReportStore};
pub use runner::{
    run_backtest_from_bars, run_backtest_from_signals, run_backtest_observed,
    run_single_backtest, BacktestResult, RunError, SCHEMA_VERSION,
};
pub use sweep::{run_sweep, ParamGrid, SweepEntry, SweepResults};
