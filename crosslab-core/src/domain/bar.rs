//! The two aligned inputs of a backtest.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily close for a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Position delta for one bar.
///
/// The running sum of `position_change` up to a bar is the share count held
/// at that bar. Upstream generators emit -1, 0 or +1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub date: NaiveDate,
    pub position_change: f64,
}

impl SignalEvent {
    pub fn new(date: NaiveDate, position_change: f64) -> Self {
        Self {
            date,
            position_change,
        }
    }

    pub fn is_entry(&self) -> bool {
        self.position_change == 1.0
    }

    pub fn is_exit(&self) -> bool {
        self.position_change == -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn entry_and_exit_are_exact_unit_deltas() {
        assert!(SignalEvent::new(day(2), 1.0).is_entry());
        assert!(SignalEvent::new(day(2), -1.0).is_exit());
        assert!(!SignalEvent::new(day(2), 0.0).is_entry());
        assert!(!SignalEvent::new(day(2), 2.0).is_entry());
        assert!(!SignalEvent::new(day(2), -0.5).is_exit());
    }

    #[test]
    fn price_bar_serialization_roundtrip() {
        let bar = PriceBar::new(day(3), 101.25);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: PriceBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
