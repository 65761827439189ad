//! Summary statistics of one backtest.

use serde::{Deserialize, Serialize};

/// Average win over average loss.
///
/// With winners and no losers the ratio is unbounded. That case is an explicit
/// variant instead of `f64::INFINITY` so it survives JSON, which has no
/// infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProfitLossRatio {
    Finite(f64),
    Infinite,
}

impl ProfitLossRatio {
    /// Literal value; `Infinite` maps to `f64::INFINITY`.
    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitLossRatio::Finite(v) => *v,
            ProfitLossRatio::Infinite => f64::INFINITY,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, ProfitLossRatio::Infinite)
    }
}

impl Default for ProfitLossRatio {
    fn default() -> Self {
        ProfitLossRatio::Finite(0.0)
    }
}

/// Performance statistics for a single run.
///
/// Percent fields are already scaled by 100. Every `f64` is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsBundle {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub win_rate_pct: f64,
    pub average_profit: f64,
    pub average_loss: f64,
    pub profit_loss_ratio: ProfitLossRatio,
}

impl StatsBundle {
    /// Statistics of a backtest that never ran a bar.
    pub fn neutral(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            final_value: initial_capital,
            total_return_pct: 0.0,
            annualized_return: 0.0,
            annualized_volatility: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            total_trades: 0,
            win_rate_pct: 0.0,
            average_profit: 0.0,
            average_loss: 0.0,
            profit_loss_ratio: ProfitLossRatio::default(),
        }
    }
}
