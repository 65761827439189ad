//! Backtest entry points: run the whole pipeline for one signal series.

use serde::{Deserialize, Serialize};

use super::analyzer::{analyze, ReturnMetrics};
use super::observer::BacktestObserver;
use super::simulator::{simulate, validate_capital, validate_series};
use super::trades::{pair_trades, summarize, TradeSummary};
use crate::domain::table::{CLOSE, POSITION_CHANGE};
use crate::domain::{PortfolioSeries, PriceBar, SignalEvent, SignalTable, StatsBundle, Trade};
use crate::error::{DegenerateInput, InvalidInputError};

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub portfolio: PortfolioSeries,
    pub trades: Vec<Trade>,
    pub stats: StatsBundle,
    /// Set when the input was valid but carried nothing to simulate.
    pub degenerate: Option<DegenerateInput>,
}

/// Run simulation, metrics and trade reconstruction over aligned inputs.
///
/// Invalid input fails before any work is done. An empty series is not an
/// error: the outcome carries neutral statistics and
/// [`DegenerateInput::EmptySeries`].
pub fn run_backtest(
    prices: &[PriceBar],
    changes: &[SignalEvent],
    initial_capital: f64,
    observer: &dyn BacktestObserver,
) -> Result<BacktestOutcome, InvalidInputError> {
    validate_capital(initial_capital)?;
    validate_series(prices, changes)?;

    if prices.is_empty() {
        let reason = DegenerateInput::EmptySeries;
        observer.on_degenerate(reason);
        let stats = StatsBundle::neutral(initial_capital);
        observer.on_complete(&stats);
        return Ok(BacktestOutcome {
            portfolio: PortfolioSeries::default(),
            trades: Vec::new(),
            stats,
            degenerate: Some(reason),
        });
    }

    observer.on_start(prices.len(), initial_capital);

    let portfolio = simulate(prices, changes, initial_capital)?;
    observer.on_simulated(&portfolio);

    let returns = analyze(&portfolio, initial_capital);
    let summary = summarize(pair_trades(prices, changes));
    for trade in &summary.trades {
        observer.on_trade_closed(trade);
    }

    let stats = assemble_stats(initial_capital, &returns, &summary);
    observer.on_complete(&stats);

    Ok(BacktestOutcome {
        portfolio,
        trades: summary.trades,
        stats,
        degenerate: None,
    })
}

/// Table form of [`run_backtest`]. Reads `close` and `position_change`;
/// other columns are ignored.
pub fn run_backtest_table(
    table: &SignalTable,
    initial_capital: f64,
    observer: &dyn BacktestObserver,
) -> Result<BacktestOutcome, InvalidInputError> {
    table.require(CLOSE)?;
    table.require(POSITION_CHANGE)?;
    let prices = table.price_bars()?;
    let changes = table.signal_events()?;
    run_backtest(&prices, &changes, initial_capital, observer)
}

fn assemble_stats(
    initial_capital: f64,
    returns: &ReturnMetrics,
    trades: &TradeSummary,
) -> StatsBundle {
    StatsBundle {
        initial_capital,
        final_value: returns.final_value,
        total_return_pct: returns.total_return_pct,
        annualized_return: returns.annualized_return,
        annualized_volatility: returns.annualized_volatility,
        sharpe_ratio: returns.sharpe_ratio,
        max_drawdown_pct: returns.max_drawdown_pct,
        total_trades: trades.total_trades,
        win_rate_pct: trades.win_rate_pct,
        average_profit: trades.average_profit,
        average_loss: trades.average_loss,
        profit_loss_ratio: trades.profit_loss_ratio,
    }
}
