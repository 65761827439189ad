//! Parameter sweep over SMA window pairs.
//!
//! Every pair runs against the same pre-loaded bars, in parallel with rayon.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crosslab_core::domain::StatsBundle;
use crosslab_core::engine::NoopObserver;

use crate::config::{BacktestConfig, RunId};
use crate::data_loader::LoadedPrices;
use crate::runner::{run_backtest_observed, RunError};

/// Window pairs to sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub short_windows: Vec<usize>,
    pub long_windows: Vec<usize>,
}

impl ParamGrid {
    pub fn new(short_windows: Vec<usize>, long_windows: Vec<usize>) -> Self {
        Self {
            short_windows,
            long_windows,
        }
    }

    /// Short windows 10, 20, 40 against long windows 50, 100, 200.
    pub fn crossover_default() -> Self {
        Self::new(vec![10, 20, 40], vec![50, 100, 200])
    }

    /// Valid `(short, long)` pairs in grid order.
    ///
    /// Pairs with a zero window or `short >= long` are skipped.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for &short in &self.short_windows {
            for &long in &self.long_windows {
                if short == 0 || short >= long {
                    continue;
                }
                pairs.push((short, long));
            }
        }
        pairs
    }

    /// Number of valid pairs.
    pub fn size(&self) -> usize {
        self.pairs().len()
    }
}

/// One grid point and its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub run_id: RunId,
    pub short_window: usize,
    pub long_window: usize,
    pub stats: StatsBundle,
}

/// Sweep output, best entry first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    pub symbol: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub entries: Vec<SweepEntry>,
}

impl SweepResults {
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run every pair of `grid` over `loaded`, ranked by Sharpe ratio.
///
/// Capital and dates come from `base`; its windows are replaced per pair.
pub fn run_sweep(
    base: &BacktestConfig,
    loaded: &LoadedPrices,
    grid: &ParamGrid,
) -> Result<SweepResults, RunError> {
    let pairs = grid.pairs();
    info!(
        symbol = %loaded.symbol,
        pairs = pairs.len(),
        bars = loaded.bars.len(),
        "starting sweep"
    );

    let mut entries = pairs
        .par_iter()
        .map(|&(short, long)| -> Result<SweepEntry, RunError> {
            let mut config = base.clone();
            config.strategy.short_window = short;
            config.strategy.long_window = long;
            let result = run_backtest_observed(&config, loaded, &NoopObserver)?;
            Ok(SweepEntry {
                run_id: result.run_id,
                short_window: short,
                long_window: long,
                stats: result.stats,
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    entries.sort_by(rank);

    if let Some(best) = entries.first() {
        info!(
            symbol = %loaded.symbol,
            short = best.short_window,
            long = best.long_window,
            sharpe = best.stats.sharpe_ratio,
            "sweep complete"
        );
    }

    Ok(SweepResults {
        symbol: loaded.symbol.clone(),
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        entries,
    })
}

/// Sharpe desc, then total return desc, then short asc, then long asc.
fn rank(a: &SweepEntry, b: &SweepEntry) -> Ordering {
    b.stats
        .sharpe_ratio
        .total_cmp(&a.stats.sharpe_ratio)
        .then_with(|| b.stats.total_return_pct.total_cmp(&a.stats.total_return_pct))
        .then_with(|| a.short_window.cmp(&b.short_window))
        .then_with(|| a.long_window.cmp(&b.long_window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crosslab_core::data::DataSource;

    use crate::data_loader::generate_synthetic_bars;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(short: usize, long: usize, sharpe: f64, ret: f64) -> SweepEntry {
        let mut stats = StatsBundle::neutral(1_000.0);
        stats.sharpe_ratio = sharpe;
        stats.total_return_pct = ret;
        SweepEntry {
            run_id: format!("{short}-{long}"),
            short_window: short,
            long_window: long,
            stats,
        }
    }

    #[test]
    fn grid_skips_invalid_pairs() {
        let grid = ParamGrid::new(vec![0, 10, 50], vec![20, 50]);
        assert_eq!(grid.pairs(), vec![(10, 20), (10, 50)]);
        assert_eq!(grid.size(), 2);
    }

    #[test]
    fn default_grid_size() {
        assert_eq!(ParamGrid::crossover_default().size(), 9);
    }

    #[test]
    fn ranking_breaks_ties() {
        let mut entries = vec![
            entry(20, 50, 1.0, 5.0),
            entry(10, 50, 1.0, 5.0),
            entry(10, 40, 1.0, 9.0),
            entry(5, 30, 2.0, -1.0),
            entry(10, 30, 1.0, 5.0),
        ];
        entries.sort_by(rank);
        let order: Vec<(usize, usize)> = entries
            .iter()
            .map(|e| (e.short_window, e.long_window))
            .collect();
        assert_eq!(order, vec![(5, 30), (10, 40), (10, 30), (10, 50), (20, 50)]);
    }

    #[test]
    fn sweep_runs_every_pair_and_is_deterministic() {
        let (start, end) = (d(2020, 1, 1), d(2021, 12, 31));
        let bars = generate_synthetic_bars("SWEEP", start, end);
        let loaded = LoadedPrices {
            symbol: "SWEEP".into(),
            company_name: None,
            bars,
            source: DataSource::Synthetic,
            has_synthetic: true,
            dataset_hash: "h".into(),
        };
        let base = BacktestConfig::new("SWEEP", start, end);
        let grid = ParamGrid::new(vec![5, 10, 20], vec![20, 60]);

        let a = run_sweep(&base, &loaded, &grid).unwrap();
        let b = run_sweep(&base, &loaded, &grid).unwrap();

        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
        assert!(a.has_synthetic);
        for pair in a.entries.windows(2) {
            assert_ne!(rank(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn empty_grid_yields_no_entries() {
        let loaded = LoadedPrices {
            symbol: "X".into(),
            company_name: None,
            bars: Vec::new(),
            source: DataSource::Store,
            has_synthetic: false,
            dataset_hash: String::new(),
        };
        let base = BacktestConfig::new("X", d(2020, 1, 1), d(2020, 2, 1));
        let results = run_sweep(&base, &loaded, &ParamGrid::new(vec![50], vec![10])).unwrap();
        assert!(results.is_empty());
        assert!(results.best().is_none());
    }
}
