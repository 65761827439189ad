//! Price data: remote providers, the local Parquet store, and the
//! local-first fetch policy that ties them together.

pub mod fetch;
pub mod provider;
pub mod store;
pub mod yahoo;

pub use fetch::{fetch_prices, PriceHistory};
pub use provider::{DataError, DataSource, FetchResult, PriceProvider, RawBar};
pub use store::{PriceStore, StoreMeta};
pub use yahoo::YahooProvider;
