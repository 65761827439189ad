//! Portfolio simulator.
//!
//! Single forward pass. Cash and share count are prefix sums of the deltas;
//! a bar with no change carries the previous share count forward.

use crate::domain::{PortfolioSeries, PortfolioState, PriceBar, SignalEvent};
use crate::error::InvalidInputError;

/// Simulate full-capital-in/full-capital-out holdings for one asset.
///
/// `prices` and `changes` must be the same length and share the same dates,
/// row for row. Buying (+1) pays that bar's close out of cash; selling (-1)
/// receives it. Any share count the deltas sum to is honoured, including
/// stacked entries and negative holdings.
pub fn simulate(
    prices: &[PriceBar],
    changes: &[SignalEvent],
    initial_capital: f64,
) -> Result<PortfolioSeries, InvalidInputError> {
    validate_capital(initial_capital)?;
    validate_series(prices, changes)?;

    let mut rows = Vec::with_capacity(prices.len());
    let mut cash = initial_capital;
    let mut shares_held = 0.0_f64;
    let mut previous_total: Option<f64> = None;

    for (bar, event) in prices.iter().zip(changes) {
        let delta = event.position_change;
        if delta != 0.0 {
            cash -= delta * bar.close;
            shares_held += delta;
        }

        let holdings_value = shares_held * bar.close;
        let total_value = cash + holdings_value;
        let period_return = previous_total.map_or(0.0, |prev| pct_change(prev, total_value));
        previous_total = Some(total_value);

        rows.push(PortfolioState {
            date: bar.date,
            close: bar.close,
            position_change: delta,
            cash,
            shares_held,
            holdings_value,
            total_value,
            period_return,
        });
    }

    Ok(PortfolioSeries::new(rows))
}

/// Fractional change from `previous` to `current`.
///
/// Undefined when the previous value is zero; that bar's return is 0.
fn pct_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let r = current / previous - 1.0;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

pub(crate) fn validate_capital(initial_capital: f64) -> Result<(), InvalidInputError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(InvalidInputError::InvalidCapital(initial_capital));
    }
    Ok(())
}

/// Shape checks shared by the simulator and the trade reconstructor.
pub(crate) fn validate_series(
    prices: &[PriceBar],
    changes: &[SignalEvent],
) -> Result<(), InvalidInputError> {
    if prices.len() != changes.len() {
        return Err(InvalidInputError::LengthMismatch {
            field: "position_change".into(),
            expected: prices.len(),
            actual: changes.len(),
        });
    }

    for (index, (bar, event)) in prices.iter().zip(changes).enumerate() {
        if bar.date != event.date {
            return Err(InvalidInputError::DateMismatch {
                index,
                price_date: bar.date,
                signal_date: event.date,
            });
        }
        if index > 0 {
            let previous = prices[index - 1].date;
            if bar.date <= previous {
                return Err(InvalidInputError::UnorderedDates {
                    index,
                    date: bar.date,
                    previous,
                });
            }
        }
        if !bar.close.is_finite() {
            return Err(InvalidInputError::NonFinite {
                field: "close".into(),
                index,
            });
        }
        if !event.position_change.is_finite() {
            return Err(InvalidInputError::NonFinite {
                field: "position_change".into(),
                index,
            });
        }
    }
    Ok(())
}
