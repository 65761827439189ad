//! Performance analyzer: return and risk metrics from the simulated series.
//!
//! Pure functions over the period-return column. Any intermediate that comes
//! out non-finite is replaced by 0 before it reaches the caller.

use serde::{Deserialize, Serialize};

use crate::domain::PortfolioSeries;

/// Trading days per year used for annualisation.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Return/risk half of the [`StatsBundle`](crate::domain::StatsBundle).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub final_value: f64,
    pub total_return_pct: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
}

/// Compute all return/risk metrics for a simulated portfolio.
///
/// An empty portfolio is worth its initial capital and has every metric at 0.
pub fn analyze(portfolio: &PortfolioSeries, initial_capital: f64) -> ReturnMetrics {
    let final_value = portfolio.final_value().unwrap_or(initial_capital);
    let returns = portfolio.period_returns();

    let annual_return = annualized_return(&returns);
    let annual_vol = annualized_volatility(&returns);

    ReturnMetrics {
        final_value,
        total_return_pct: total_return_pct(final_value, initial_capital),
        annualized_return: annual_return,
        annualized_volatility: annual_vol,
        sharpe_ratio: sharpe_ratio(annual_return, annual_vol),
        max_drawdown_pct: max_drawdown_pct(&returns),
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final / initial - 1) * 100`.
pub fn total_return_pct(final_value: f64, initial_capital: f64) -> f64 {
    if initial_capital == 0.0 {
        return 0.0;
    }
    finite_or_zero((final_value / initial_capital - 1.0) * 100.0)
}

/// Mean period return scaled to a year.
pub fn annualized_return(returns: &[f64]) -> f64 {
    finite_or_zero(mean(returns) * TRADING_DAYS_PER_YEAR)
}

/// Sample standard deviation of period returns scaled to a year.
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    finite_or_zero(sample_std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Annualised return over annualised volatility, risk-free rate 0.
///
/// Zero volatility gives a ratio of 0.
pub fn sharpe_ratio(annualized_return: f64, annualized_volatility: f64) -> f64 {
    if annualized_volatility > 0.0 {
        finite_or_zero(annualized_return / annualized_volatility)
    } else {
        0.0
    }
}

/// Deepest fall of the compounded return index below its running peak, in
/// percent. Never positive.
pub fn max_drawdown_pct(returns: &[f64]) -> f64 {
    let mut index = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns {
        index *= 1.0 + r;
        if index > peak {
            peak = index;
        }
        if peak > 0.0 {
            let dd = (index - peak) / peak;
            if dd.is_finite() && dd < worst {
                worst = dd;
            }
        }
    }
    worst * 100.0
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with the n-1 denominator; 0 below two observations.
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
