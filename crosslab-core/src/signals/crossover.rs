//! SMA crossover: long while the short average is above the long average.
//!
//! The raw state (`signal`) is 1 while short > long and 0 otherwise, forced to
//! 0 for the first `short_window` bars. The engine consumes its first
//! difference, `position_change`: +1 on a golden cross, -1 on a death cross.

use super::sma::rolling_mean;
use super::SignalError;
use crate::domain::table::{CLOSE, POSITION_CHANGE};
use crate::domain::{PriceBar, SignalTable};

/// Column holding the short moving average.
pub const SHORT_MAVG: &str = "short_mavg";
/// Column holding the long moving average.
pub const LONG_MAVG: &str = "long_mavg";
/// Column holding the raw 0/1 crossover state.
pub const SIGNAL: &str = "signal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmaCrossover {
    short_window: usize,
    long_window: usize,
}

impl SmaCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, SignalError> {
        if short_window == 0 {
            return Err(SignalError::ZeroWindow);
        }
        if short_window >= long_window {
            return Err(SignalError::WindowOrder {
                short: short_window,
                long: long_window,
            });
        }
        Ok(Self {
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    /// Build the signal table for `bars`.
    pub fn generate(&self, bars: &[PriceBar]) -> SignalTable {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let short_mavg = rolling_mean(&closes, self.short_window);
        let long_mavg = rolling_mean(&closes, self.long_window);

        let signal: Vec<f64> = short_mavg
            .iter()
            .zip(&long_mavg)
            .enumerate()
            .map(|(i, (s, l))| {
                if i >= self.short_window && s > l {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let mut position_change = Vec::with_capacity(signal.len());
        for i in 0..signal.len() {
            position_change.push(if i == 0 { 0.0 } else { signal[i] - signal[i - 1] });
        }

        SignalTable::from_columns(
            bars.iter().map(|b| b.date).collect(),
            [
                (CLOSE, closes),
                (SHORT_MAVG, short_mavg),
                (LONG_MAVG, long_mavg),
                (SIGNAL, signal),
                (POSITION_CHANGE, position_change),
            ],
        )
    }
}
