//! Domain types for CrossLab

pub mod bar;
pub mod portfolio;
pub mod stats;
pub mod table;
pub mod trade;

pub use bar::{PriceBar, SignalEvent};
pub use portfolio::{PortfolioSeries, PortfolioState};
pub use stats::{ProfitLossRatio, StatsBundle};
pub use table::SignalTable;
pub use trade::Trade;
