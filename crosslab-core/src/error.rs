//! Engine input errors and the soft degenerate-input marker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected engine input. Raised before any computation starts, so a caller
/// never sees a partial portfolio.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("required field '{field}' is missing from the signal series")]
    MissingField { field: String },

    #[error("'{field}' has {actual} rows but the series has {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("price and signal dates diverge at row {index}: {price_date} vs {signal_date}")]
    DateMismatch {
        index: usize,
        price_date: NaiveDate,
        signal_date: NaiveDate,
    },

    #[error("dates must be strictly ascending: row {index} ({date}) does not follow {previous}")]
    UnorderedDates {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("'{field}' is not finite at row {index}")]
    NonFinite { field: String, index: usize },

    #[error("initial capital must be a finite positive number, got {0}")]
    InvalidCapital(f64),
}

/// Input that is valid but carries no information. The engine still returns a
/// fully defined outcome and tags it with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateInput {
    /// Zero bars: every metric sits at its neutral value.
    EmptySeries,
}

impl std::fmt::Display for DegenerateInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegenerateInput::EmptySeries => write!(f, "empty series"),
        }
    }
}
