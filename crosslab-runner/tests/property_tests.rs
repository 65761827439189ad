//! Property tests for runner invariants.
//!
//! 1. Grid pairs are always valid crossover windows
//! 2. Run ids are stable and sensitive to the parameters and the dataset
//! 3. Synthetic bars are deterministic, weekday-only and positive

use chrono::{Datelike, NaiveDate, Weekday};
use proptest::prelude::*;

use crosslab_runner::config::BacktestConfig;
use crosslab_runner::data_loader::generate_synthetic_bars;
use crosslab_runner::sweep::ParamGrid;

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2010, 1, 1).unwrap() + chrono::Duration::days(offset)
    })
}

fn arb_symbol() -> impl Strategy<Value = String> {
    "[A-Z]{1,5}"
}

proptest! {
    #[test]
    fn grid_pairs_are_valid(
        shorts in prop::collection::vec(0usize..300, 0..6),
        longs in prop::collection::vec(0usize..300, 0..6),
    ) {
        let grid = ParamGrid::new(shorts.clone(), longs.clone());
        let pairs = grid.pairs();
        prop_assert!(pairs.len() <= shorts.len() * longs.len());
        prop_assert_eq!(pairs.len(), grid.size());
        for (short, long) in pairs {
            prop_assert!(short > 0);
            prop_assert!(short < long);
        }
    }

    #[test]
    fn run_id_tracks_parameters(
        symbol in arb_symbol(),
        start in arb_date(),
        span in 1i64..2_000,
        short in 1usize..50,
        extra in 1usize..200,
    ) {
        let end = start + chrono::Duration::days(span);
        let mut config = BacktestConfig::new(symbol, start, end);
        config.strategy.short_window = short;
        config.strategy.long_window = short + extra;

        let data = "dataset";
        prop_assert_eq!(config.run_id(data), config.clone().run_id(data));
        prop_assert_ne!(config.run_id(data), config.run_id("other dataset"));

        let mut capital = config.clone();
        capital.backtest.initial_capital += 1.0;
        prop_assert_ne!(config.run_id(data), capital.run_id(data));

        let mut long = config.clone();
        long.strategy.long_window += 1;
        prop_assert_ne!(config.run_id(data), long.run_id(data));

        let mut synthetic = config.clone();
        synthetic.data.synthetic = !synthetic.data.synthetic;
        prop_assert_ne!(config.run_id(data), synthetic.run_id(data));
    }

    #[test]
    fn synthetic_bars_are_well_formed(
        symbol in arb_symbol(),
        start in arb_date(),
        span in 0i64..120,
    ) {
        let end = start + chrono::Duration::days(span);
        let bars = generate_synthetic_bars(&symbol, start, end);
        prop_assert_eq!(&bars, &generate_synthetic_bars(&symbol, start, end));

        for bar in &bars {
            prop_assert!(bar.date >= start && bar.date <= end);
            prop_assert!(!matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun));
            prop_assert!(bar.close > 0.0);
            prop_assert!(bar.low <= bar.open.min(bar.close));
            prop_assert!(bar.high >= bar.open.max(bar.close));
        }
        for pair in bars.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }
}
