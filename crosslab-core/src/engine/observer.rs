//! Observer hook for engine progress.
//!
//! The engine never logs. Callers that want progress or diagnostics pass an
//! observer; every method has an empty default body.

use crate::domain::{PortfolioSeries, StatsBundle, Trade};
use crate::error::DegenerateInput;

pub trait BacktestObserver {
    /// Inputs validated, simulation about to start.
    fn on_start(&self, _bar_count: usize, _initial_capital: f64) {}

    /// Portfolio series fully simulated.
    fn on_simulated(&self, _portfolio: &PortfolioSeries) {}

    /// Called once per closed trade, in chronological order.
    fn on_trade_closed(&self, _trade: &Trade) {}

    /// The run was valid but degenerate; neutral statistics follow.
    fn on_degenerate(&self, _reason: DegenerateInput) {}

    /// Final statistics assembled.
    fn on_complete(&self, _stats: &StatsBundle) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BacktestObserver for NoopObserver {}
