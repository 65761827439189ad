//! A closed trade: an entry paired with the next exit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed round trip. Open positions never become a `Trade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    pub bars_held: usize,
    /// `(exit_price - entry_price) / entry_price`
    pub profit_fraction: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.profit_fraction > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.profit_fraction < 0.0
    }

    /// Neither winner nor loser. Still counted in the trade total.
    pub fn is_breakeven(&self) -> bool {
        self.profit_fraction == 0.0
    }
}
