//! End-to-end engine scenarios through the public API.

use chrono::NaiveDate;
use crosslab_core::domain::table::{CLOSE, POSITION_CHANGE};
use crosslab_core::domain::{PriceBar, ProfitLossRatio, SignalEvent, SignalTable, StatsBundle};
use crosslab_core::engine::{run_backtest, run_backtest_table, NoopObserver};
use crosslab_core::{DegenerateInput, InvalidInputError};

// ── Helpers ──────────────────────────────────────────────────────────

fn dates(n: usize) -> Vec<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect()
}

fn series(closes: &[f64], deltas: &[f64]) -> (Vec<PriceBar>, Vec<SignalEvent>) {
    let ds = dates(closes.len());
    (
        ds.iter()
            .zip(closes)
            .map(|(&d, &c)| PriceBar::new(d, c))
            .collect(),
        ds.iter()
            .zip(deltas)
            .map(|(&d, &x)| SignalEvent::new(d, x))
            .collect(),
    )
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn buy_at_100_sell_at_120() {
    let (p, c) = series(&[100.0, 120.0], &[1.0, -1.0]);
    let out = run_backtest(&p, &c, 100_000.0, &NoopObserver).unwrap();

    let rows = out.portfolio.rows();
    assert_eq!(rows[0].shares_held, 1.0);
    assert_eq!(rows[0].cash, 99_900.0);
    assert_eq!(rows[1].shares_held, 0.0);
    assert_eq!(rows[1].cash, 100_020.0);
    assert_eq!(rows[1].total_value, 100_020.0);

    let s = out.stats;
    assert_eq!(s.final_value, 100_020.0);
    assert!(approx(s.total_return_pct, 0.02));
    assert_eq!(s.total_trades, 1);
    assert_eq!(s.win_rate_pct, 100.0);
    assert!(approx(s.average_profit, 0.2));
    assert_eq!(s.average_loss, 0.0);
    assert_eq!(s.profit_loss_ratio, ProfitLossRatio::Infinite);

    // Returns are [0, 0.0002].
    assert!(approx(s.annualized_return, 0.0001 * 252.0));
    let vol = (0.0002_f64 * 0.0002 / 2.0).sqrt() * 252.0_f64.sqrt();
    assert!(approx(s.annualized_volatility, vol));
    assert!(approx(s.sharpe_ratio, s.annualized_return / vol));
    assert_eq!(s.max_drawdown_pct, 0.0);
}

#[test]
fn two_round_trips() {
    let (p, c) = series(&[10.0, 12.0, 8.0, 9.0], &[1.0, -1.0, 1.0, -1.0]);
    let out = run_backtest(&p, &c, 1_000.0, &NoopObserver).unwrap();

    assert_eq!(out.trades.len(), 2);
    assert!(approx(out.trades[0].profit_fraction, 0.2));
    assert!(approx(out.trades[1].profit_fraction, 0.125));
    assert_eq!(out.stats.win_rate_pct, 100.0);
    // 1000 - 10 + 12 - 8 + 9
    assert_eq!(out.stats.final_value, 1_003.0);
}

#[test]
fn holding_through_a_decline_records_drawdown() {
    let (p, c) = series(&[100.0, 100.0, 50.0, 75.0], &[1.0, 0.0, 0.0, -1.0]);
    let out = run_backtest(&p, &c, 100.0, &NoopObserver).unwrap();

    let totals = out.portfolio.total_values();
    assert_eq!(totals, vec![100.0, 100.0, 50.0, 75.0]);
    assert!(approx(out.stats.max_drawdown_pct, -50.0));
    assert_eq!(out.stats.total_trades, 1);
    assert_eq!(out.stats.win_rate_pct, 0.0);
    assert!(approx(out.stats.average_loss, 0.25));
    assert_eq!(out.stats.profit_loss_ratio, ProfitLossRatio::Finite(0.0));
    assert_eq!(out.stats.total_return_pct, -25.0);
}

#[test]
fn no_signals_leaves_capital_untouched() {
    let (p, c) = series(&[10.0, 11.0, 9.0, 13.0], &[0.0; 4]);
    let out = run_backtest(&p, &c, 5_000.0, &NoopObserver).unwrap();

    assert!(out.portfolio.rows().iter().all(|r| r.shares_held == 0.0));
    assert!(out.portfolio.total_values().iter().all(|&v| v == 5_000.0));
    assert_eq!(out.stats.total_return_pct, 0.0);
    assert_eq!(out.stats.sharpe_ratio, 0.0);
    assert_eq!(out.stats.annualized_volatility, 0.0);
    assert_eq!(out.stats.total_trades, 0);
}

#[test]
fn single_bar_has_zero_volatility_and_sharpe() {
    let (p, c) = series(&[42.0], &[1.0]);
    let out = run_backtest(&p, &c, 1_000.0, &NoopObserver).unwrap();
    assert_eq!(out.stats.annualized_volatility, 0.0);
    assert_eq!(out.stats.sharpe_ratio, 0.0);
    assert_eq!(out.stats.total_trades, 0);
}

#[test]
fn empty_table_gives_neutral_stats() {
    let table = SignalTable::new(Vec::new())
        .with_column(CLOSE, Vec::new())
        .unwrap()
        .with_column(POSITION_CHANGE, Vec::new())
        .unwrap();
    let out = run_backtest_table(&table, 10_000.0, &NoopObserver).unwrap();
    assert_eq!(out.stats, StatsBundle::neutral(10_000.0));
    assert_eq!(out.degenerate, Some(DegenerateInput::EmptySeries));
}

#[test]
fn length_mismatch_fails_before_any_work() {
    let (p, mut c) = series(&[10.0, 11.0, 12.0], &[1.0, 0.0, -1.0]);
    c.pop();
    let err = run_backtest(&p, &c, 1_000.0, &NoopObserver).unwrap_err();
    assert!(matches!(err, InvalidInputError::LengthMismatch { .. }));
}

#[test]
fn non_finite_close_is_rejected() {
    let (p, c) = series(&[10.0, f64::NAN], &[1.0, -1.0]);
    let err = run_backtest(&p, &c, 1_000.0, &NoopObserver).unwrap_err();
    assert!(matches!(err, InvalidInputError::NonFinite { .. }));
}

#[test]
fn outcome_serializes_without_infinities() {
    let (p, c) = series(&[100.0, 120.0], &[1.0, -1.0]);
    let out = run_backtest(&p, &c, 100_000.0, &NoopObserver).unwrap();
    let json = serde_json::to_string(&out).unwrap();
    assert!(json.contains(r#""profit_loss_ratio":{"kind":"infinite"}"#));

    let back: crosslab_core::engine::BacktestOutcome = serde_json::from_str(&json).unwrap();
    assert_eq!(back.stats.profit_loss_ratio, ProfitLossRatio::Infinite);
    assert_eq!(back.trades.len(), 1);
}
