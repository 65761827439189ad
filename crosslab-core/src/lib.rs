//! CrossLab Core: domain types, backtest engine, SMA signals, price data.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (price bars, signal tables, portfolio rows, trades, stats)
//! - Portfolio simulation over a position-change series
//! - Performance metrics (return, volatility, Sharpe, drawdown)
//! - Trade reconstruction and trade statistics
//! - SMA crossover signal generation
//! - Price data: Yahoo provider, Parquet store, local-first fetch

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod signals;

pub use error::{DegenerateInput, InvalidInputError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across sweep worker threads are
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::SignalEvent>();
        require_sync::<domain::SignalEvent>();
        require_send::<domain::SignalTable>();
        require_sync::<domain::SignalTable>();
        require_send::<domain::PortfolioSeries>();
        require_sync::<domain::PortfolioSeries>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::StatsBundle>();
        require_sync::<domain::StatsBundle>();

        // Engine types
        require_send::<engine::BacktestOutcome>();
        require_sync::<engine::BacktestOutcome>();
        require_send::<engine::NoopObserver>();
        require_sync::<engine::NoopObserver>();
        require_send::<signals::SmaCrossover>();
        require_sync::<signals::SmaCrossover>();

        // Data types
        require_send::<data::PriceStore>();
        require_sync::<data::PriceStore>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
    }

    /// Architecture contract: the engine takes its observer by shared
    /// reference, so an observer can never mutate engine state.
    #[test]
    fn engine_accepts_any_observer_as_trait_object() {
        fn _check_trait_object_builds(
            observer: &dyn engine::BacktestObserver,
        ) -> Result<engine::BacktestOutcome, InvalidInputError> {
            engine::run_backtest(&[], &[], 1.0, observer)
        }
    }
}
