//! Engine observer that reports progress through `tracing`.

use tracing::{debug, info, warn};

use crosslab_core::domain::{PortfolioSeries, StatsBundle, Trade};
use crosslab_core::engine::BacktestObserver;
use crosslab_core::DegenerateInput;

/// Logs each engine phase under the run's symbol.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    symbol: String,
}

impl TracingObserver {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl BacktestObserver for TracingObserver {
    fn on_start(&self, bar_count: usize, initial_capital: f64) {
        info!(symbol = %self.symbol, bar_count, initial_capital, "backtest started");
    }

    fn on_simulated(&self, portfolio: &PortfolioSeries) {
        debug!(
            symbol = %self.symbol,
            rows = portfolio.len(),
            final_value = portfolio.final_value().unwrap_or_default(),
            "portfolio simulated"
        );
    }

    fn on_trade_closed(&self, trade: &Trade) {
        debug!(
            symbol = %self.symbol,
            entry = %trade.entry_date,
            exit = %trade.exit_date,
            profit_fraction = trade.profit_fraction,
            "trade closed"
        );
    }

    fn on_degenerate(&self, reason: DegenerateInput) {
        warn!(symbol = %self.symbol, %reason, "nothing to simulate, reporting neutral statistics");
    }

    fn on_complete(&self, stats: &StatsBundle) {
        info!(
            symbol = %self.symbol,
            final_value = stats.final_value,
            total_return_pct = stats.total_return_pct,
            sharpe = stats.sharpe_ratio,
            trades = stats.total_trades,
            "backtest complete"
        );
    }
}
