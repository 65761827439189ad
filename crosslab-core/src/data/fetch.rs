//! Local-first price fetching.
//!
//! The store answers when it already reaches the day before `end`. Otherwise
//! only the missing tail is requested from the provider, merged into the
//! store, and the requested range is re-read from disk.

use chrono::{Days, NaiveDate};

use super::provider::{DataError, DataSource, PriceProvider, RawBar};
use super::store::PriceStore;
use crate::domain::PriceBar;

/// Bars for one symbol over a requested range, with provenance.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub symbol: String,
    pub company_name: Option<String>,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
    /// Provider failure that forced a fall back to stored data.
    pub remote_error: Option<String>,
}

impl PriceHistory {
    pub fn price_bars(&self) -> Vec<PriceBar> {
        self.bars.iter().map(RawBar::to_price_bar).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Whether stored data ending at `latest` is recent enough for `end`.
pub fn store_is_current(latest: Option<NaiveDate>, end: NaiveDate) -> bool {
    let threshold = end.checked_sub_days(Days::new(1)).unwrap_or(end);
    latest.is_some_and(|d| d >= threshold)
}

/// Load `symbol` over `[start, end]`, topping the store up from `provider`
/// when it is behind.
pub fn fetch_prices(
    store: &PriceStore,
    provider: Option<&dyn PriceProvider>,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceHistory, DataError> {
    if start > end {
        return Err(DataError::InvalidRange { start, end });
    }

    let latest = store.latest_date(symbol);
    let mut source = DataSource::Store;
    let mut remote_error = None;

    if !store_is_current(latest, end) {
        if let Some(provider) = provider.filter(|p| p.is_available()) {
            let fetch_from = match latest.and_then(|d| d.succ_opt()) {
                Some(next) if next > start => next,
                _ => start,
            };
            match provider.fetch(symbol, fetch_from, end) {
                Ok(result) if !result.bars.is_empty() => {
                    store.merge(symbol, result.company_name.as_deref(), &result.bars)?;
                    source = DataSource::Remote;
                }
                Ok(_) => {}
                Err(e) => remote_error = Some(format!("{}: {e}", provider.name())),
            }
        }
    }

    let bars = store.load_range(symbol, start, end)?;
    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }

    Ok(PriceHistory {
        symbol: symbol.to_string(),
        company_name: store.meta(symbol).and_then(|m| m.company_name),
        bars,
        source,
        remote_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FetchResult;
    use chrono::Datelike;
    use std::sync::Mutex;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekdays(start: NaiveDate, end: NaiveDate, close: f64) -> Vec<RawBar> {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| day.weekday().number_from_monday() <= 5)
            .map(|date| RawBar {
                date,
                open: close,
                high: close,
                low: close,
                close,
                volume: 100,
            })
            .collect()
    }

    struct MockProvider {
        calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
        fail: bool,
    }

    impl MockProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PriceProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.lock().unwrap().push((start, end));
            if self.fail {
                return Err(DataError::NetworkUnreachable("offline".into()));
            }
            Ok(FetchResult {
                symbol: symbol.to_string(),
                company_name: Some("Mock Corp".into()),
                bars: weekdays(start, end, 50.0),
            })
        }
    }

    #[test]
    fn empty_store_fetches_the_whole_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path());
        let provider = MockProvider::new(false);

        let history =
            fetch_prices(&store, Some(&provider), "MOCK", d(2024, 1, 1), d(2024, 1, 12)).unwrap();

        assert_eq!(provider.calls(), vec![(d(2024, 1, 1), d(2024, 1, 12))]);
        assert_eq!(history.source, DataSource::Remote);
        assert_eq!(history.len(), 10);
        assert_eq!(history.company_name.as_deref(), Some("Mock Corp"));
        assert_eq!(store.latest_date("MOCK"), Some(d(2024, 1, 12)));
    }

    #[test]
    fn current_store_skips_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path());
        store
            .merge("MOCK", None, &weekdays(d(2024, 1, 1), d(2024, 1, 11), 10.0))
            .unwrap();
        let provider = MockProvider::new(false);

        // Stored data reaching end - 1 day is good enough.
        let history =
            fetch_prices(&store, Some(&provider), "MOCK", d(2024, 1, 3), d(2024, 1, 12)).unwrap();

        assert!(provider.calls().is_empty());
        assert_eq!(history.source, DataSource::Store);
        assert_eq!(history.bars.first().unwrap().date, d(2024, 1, 3));
        assert_eq!(history.len(), 7);
    }

    #[test]
    fn stale_store_fetches_only_the_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path());
        store
            .merge("MOCK", None, &weekdays(d(2024, 1, 1), d(2024, 1, 5), 10.0))
            .unwrap();
        let provider = MockProvider::new(false);

        let history =
            fetch_prices(&store, Some(&provider), "MOCK", d(2024, 1, 1), d(2024, 1, 19)).unwrap();

        assert_eq!(provider.calls(), vec![(d(2024, 1, 6), d(2024, 1, 19))]);
        assert_eq!(history.source, DataSource::Remote);
        assert_eq!(history.len(), 15);
        assert_eq!(history.bars[0].close, 10.0);
        assert_eq!(history.bars[14].close, 50.0);
    }

    #[test]
    fn provider_failure_falls_back_to_stored_bars() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path());
        store
            .merge("MOCK", None, &weekdays(d(2024, 1, 1), d(2024, 1, 5), 10.0))
            .unwrap();
        let provider = MockProvider::new(true);

        let history =
            fetch_prices(&store, Some(&provider), "MOCK", d(2024, 1, 1), d(2024, 1, 31)).unwrap();

        assert_eq!(history.source, DataSource::Store);
        assert_eq!(history.len(), 5);
        assert!(history.remote_error.unwrap().contains("offline"));
    }

    #[test]
    fn nothing_anywhere_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path());
        let err = fetch_prices(&store, None, "MOCK", d(2024, 1, 1), d(2024, 1, 31)).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path());
        let err = fetch_prices(&store, None, "MOCK", d(2024, 2, 1), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, DataError::InvalidRange { .. }));
    }

    #[test]
    fn currency_threshold_is_one_day_before_end() {
        assert!(store_is_current(Some(d(2024, 3, 7)), d(2024, 3, 8)));
        assert!(!store_is_current(Some(d(2024, 3, 6)), d(2024, 3, 8)));
        assert!(!store_is_current(None, d(2024, 3, 8)));
    }
}
