//! SignalTable: column-oriented signal series.
//!
//! One date index plus any number of named `f64` columns. The engine reads
//! `close` and `position_change`; everything else (moving averages, the raw
//! crossover state, user indicators) rides along untouched.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::{PriceBar, SignalEvent};
use crate::error::InvalidInputError;

/// Column holding the daily close.
pub const CLOSE: &str = "close";
/// Column holding the per-bar position delta.
pub const POSITION_CHANGE: &str = "position_change";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl SignalTable {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: BTreeMap::new(),
        }
    }

    /// Table from columns already known to match `dates` in length.
    pub(crate) fn from_columns<const N: usize>(
        dates: Vec<NaiveDate>,
        columns: [(&str, Vec<f64>); N],
    ) -> Self {
        debug_assert!(columns.iter().all(|(_, v)| v.len() == dates.len()));
        Self {
            dates,
            columns: columns
                .into_iter()
                .map(|(name, values)| (name.to_string(), values))
                .collect(),
        }
    }

    /// Builder form of [`insert_column`](Self::insert_column).
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, InvalidInputError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Add or replace a column. Its length must match the date index.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), InvalidInputError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(InvalidInputError::LengthMismatch {
                field: name,
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Like [`column`](Self::column) but a missing column is an input error.
    pub fn require(&self, name: &str) -> Result<&[f64], InvalidInputError> {
        self.column(name)
            .ok_or_else(|| InvalidInputError::MissingField {
                field: name.to_string(),
            })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The `close` column as price bars.
    pub fn price_bars(&self) -> Result<Vec<PriceBar>, InvalidInputError> {
        let closes = self.require(CLOSE)?;
        Ok(self
            .dates
            .iter()
            .zip(closes)
            .map(|(&date, &close)| PriceBar { date, close })
            .collect())
    }

    /// The `position_change` column as signal events.
    pub fn signal_events(&self) -> Result<Vec<SignalEvent>, InvalidInputError> {
        let changes = self.require(POSITION_CHANGE)?;
        Ok(self
            .dates
            .iter()
            .zip(changes)
            .map(|(&date, &position_change)| SignalEvent {
                date,
                position_change,
            })
            .collect())
    }
}
