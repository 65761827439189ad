//! Signal generation: turns a price series into a signal table.

pub mod crossover;
pub mod sma;

pub use crossover::{SmaCrossover, LONG_MAVG, SHORT_MAVG, SIGNAL};
pub use sma::rolling_mean;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("short window must be at least 1")]
    ZeroWindow,

    #[error("short window ({short}) must be smaller than long window ({long})")]
    WindowOrder { short: usize, long: usize },
}
