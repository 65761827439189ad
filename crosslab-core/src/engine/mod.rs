//! Backtest engine: simulation, metrics and trade reconstruction.
//!
//! Signal series → [`simulate`] → {[`analyze`], [`reconstruct`]} → [`StatsBundle`].
//! Everything here is synchronous and free of I/O.
//!
//! [`StatsBundle`]: crate::domain::StatsBundle

pub mod analyzer;
pub mod backtest;
pub mod observer;
pub mod simulator;
pub mod trades;

pub use analyzer::{analyze, ReturnMetrics, TRADING_DAYS_PER_YEAR};
pub use backtest::{run_backtest, run_backtest_table, BacktestOutcome};
pub use observer::{BacktestObserver, NoopObserver};
pub use simulator::simulate;
pub use trades::{reconstruct, TradeSummary};
