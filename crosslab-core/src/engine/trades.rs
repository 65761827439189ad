//! Trade reconstruction: pairs entries with exits and scores the trades.
//!
//! Sequential by nature: whether a -1 closes anything depends on whether an
//! entry is currently open. Only one entry can be open at a time; a second +1
//! while open is ignored, as is a -1 with nothing open.

use serde::{Deserialize, Serialize};

use super::analyzer::mean;
use super::simulator::validate_series;
use crate::domain::{PriceBar, ProfitLossRatio, SignalEvent, Trade};
use crate::error::InvalidInputError;

/// Closed trades plus the trade-level statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub trades: Vec<Trade>,
    pub total_trades: usize,
    pub win_rate_pct: f64,
    pub average_profit: f64,
    pub average_loss: f64,
    pub profit_loss_ratio: ProfitLossRatio,
}

/// Reconstruct trades from aligned prices and position changes.
pub fn reconstruct(
    prices: &[PriceBar],
    changes: &[SignalEvent],
) -> Result<TradeSummary, InvalidInputError> {
    validate_series(prices, changes)?;
    Ok(summarize(pair_trades(prices, changes)))
}

/// Open entry being tracked during the scan.
struct OpenEntry {
    index: usize,
    date: chrono::NaiveDate,
    price: f64,
}

/// Walk the series and emit one [`Trade`] per closed entry.
///
/// Assumes the inputs are already validated and aligned. An entry still open
/// at the end of the series is dropped.
pub fn pair_trades(prices: &[PriceBar], changes: &[SignalEvent]) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut open: Option<OpenEntry> = None;

    for (index, (bar, event)) in prices.iter().zip(changes).enumerate() {
        if event.is_entry() {
            if open.is_none() {
                open = Some(OpenEntry {
                    index,
                    date: bar.date,
                    price: bar.close,
                });
            }
        } else if event.is_exit() {
            if let Some(entry) = open.take() {
                trades.push(Trade {
                    entry_index: entry.index,
                    entry_date: entry.date,
                    entry_price: entry.price,
                    exit_index: index,
                    exit_date: bar.date,
                    exit_price: bar.close,
                    bars_held: index - entry.index,
                    profit_fraction: profit_fraction(entry.price, bar.close),
                });
            }
        }
    }

    trades
}

/// Score a list of closed trades.
pub fn summarize(trades: Vec<Trade>) -> TradeSummary {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.profit_fraction)
        .collect();
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.profit_fraction.abs())
        .collect();

    let average_profit = mean(&wins);
    let average_loss = mean(&losses);

    TradeSummary {
        total_trades: trades.len(),
        win_rate_pct: win_rate_pct(&trades),
        average_profit,
        average_loss,
        profit_loss_ratio: profit_loss_ratio(average_profit, average_loss),
        trades,
    }
}

/// Percentage of trades with a positive profit fraction; 0 without trades.
pub fn win_rate_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Average win over average loss.
///
/// No losses but some profit is unbounded; no losses and no profit is 0.
pub fn profit_loss_ratio(average_profit: f64, average_loss: f64) -> ProfitLossRatio {
    if average_loss > 0.0 {
        let ratio = average_profit / average_loss;
        if ratio.is_finite() {
            return ProfitLossRatio::Finite(ratio);
        }
        return ProfitLossRatio::Infinite;
    }
    if average_profit > 0.0 {
        ProfitLossRatio::Infinite
    } else {
        ProfitLossRatio::Finite(0.0)
    }
}

fn profit_fraction(entry_price: f64, exit_price: f64) -> f64 {
    if entry_price == 0.0 {
        return 0.0;
    }
    let p = (exit_price - entry_price) / entry_price;
    if p.is_finite() {
        p
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(closes: &[f64], deltas: &[f64]) -> (Vec<PriceBar>, Vec<SignalEvent>) {
        let base = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let date = |i: usize| base + chrono::Duration::days(i as i64);
        (
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| PriceBar::new(date(i), c))
                .collect(),
            deltas
                .iter()
                .enumerate()
                .map(|(i, &d)| SignalEvent::new(date(i), d))
                .collect(),
        )
    }

    #[test]
    fn pairs_two_round_trips() {
        let (p, c) = series(&[10.0, 12.0, 8.0, 9.0], &[1.0, -1.0, 1.0, -1.0]);
        let summary = reconstruct(&p, &c).unwrap();
        assert_eq!(summary.total_trades, 2);
        assert!((summary.trades[0].profit_fraction - 0.2).abs() < 1e-12);
        assert!((summary.trades[1].profit_fraction - 0.125).abs() < 1e-12);
        assert_eq!(summary.win_rate_pct, 100.0);
        assert_eq!(summary.profit_loss_ratio, ProfitLossRatio::Infinite);
    }

    #[test]
    fn open_entry_is_not_counted() {
        let (p, c) = series(&[10.0], &[1.0]);
        let summary = reconstruct(&p, &c).unwrap();
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.win_rate_pct, 0.0);
        assert_eq!(summary.profit_loss_ratio, ProfitLossRatio::Finite(0.0));
    }

    #[test]
    fn second_entry_while_open_is_ignored() {
        let (p, c) = series(&[10.0, 20.0, 15.0], &[1.0, 1.0, -1.0]);
        let trades = pair_trades(&p, &c);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_price, 10.0);
        assert_eq!(trades[0].entry_index, 0);
        assert_eq!(trades[0].bars_held, 2);
    }

    #[test]
    fn exit_without_entry_is_ignored() {
        let (p, c) = series(&[10.0, 11.0, 12.0], &[-1.0, 1.0, -1.0]);
        let trades = pair_trades(&p, &c);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_price, 11.0);
        assert_eq!(trades[0].exit_price, 12.0);
    }

    #[test]
    fn non_unit_deltas_are_not_events() {
        let (p, c) = series(&[10.0, 11.0, 12.0], &[2.0, -0.5, -1.0]);
        assert!(pair_trades(&p, &c).is_empty());
    }

    #[test]
    fn mixed_outcomes() {
        // +20%, -10%, 0%, -30%
        let (p, c) = series(
            &[100.0, 120.0, 100.0, 90.0, 50.0, 50.0, 100.0, 70.0],
            &[1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
        );
        let summary = reconstruct(&p, &c).unwrap();
        assert_eq!(summary.total_trades, 4);
        assert_eq!(summary.win_rate_pct, 25.0);
        assert!((summary.average_profit - 0.2).abs() < 1e-12);
        assert!((summary.average_loss - 0.2).abs() < 1e-12);
        match summary.profit_loss_ratio {
            ProfitLossRatio::Finite(r) => assert!((r - 1.0).abs() < 1e-12),
            ProfitLossRatio::Infinite => panic!("expected a finite ratio"),
        }
    }

    #[test]
    fn breakeven_only_counts_toward_total() {
        let (p, c) = series(&[50.0, 50.0], &[1.0, -1.0]);
        let summary = reconstruct(&p, &c).unwrap();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.win_rate_pct, 0.0);
        assert_eq!(summary.average_profit, 0.0);
        assert_eq!(summary.average_loss, 0.0);
        assert_eq!(summary.profit_loss_ratio, ProfitLossRatio::Finite(0.0));
    }

    #[test]
    fn all_losers_ratio_is_zero() {
        assert_eq!(profit_loss_ratio(0.0, 0.1), ProfitLossRatio::Finite(0.0));
    }

    #[test]
    fn misaligned_input_is_rejected() {
        let (p, mut c) = series(&[10.0, 11.0], &[1.0, -1.0]);
        c.pop();
        assert!(reconstruct(&p, &c).is_err());
    }
}
