//! Simulated portfolio, one row per bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio snapshot at the close of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub date: NaiveDate,
    pub close: f64,
    pub position_change: f64,
    pub cash: f64,
    pub shares_held: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    /// `total_value[t] / total_value[t-1] - 1`; 0 on the first bar.
    pub period_return: f64,
}

/// The simulated equity curve, in bar order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioSeries {
    rows: Vec<PortfolioState>,
}

impl PortfolioSeries {
    pub fn new(rows: Vec<PortfolioState>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[PortfolioState] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&PortfolioState> {
        self.rows.last()
    }

    /// Total value of the last bar, if any.
    pub fn final_value(&self) -> Option<f64> {
        self.rows.last().map(|r| r.total_value)
    }

    pub fn total_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.total_value).collect()
    }

    pub fn period_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.period_return).collect()
    }

    pub fn into_rows(self) -> Vec<PortfolioState> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a PortfolioSeries {
    type Item = &'a PortfolioState;
    type IntoIter = std::slice::Iter<'a, PortfolioState>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
