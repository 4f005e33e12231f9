//! Fixed in-memory price series provider
//!
//! Serves pre-loaded series without network access. Used for offline runs
//! (cache-only pricing) and for replaying scripted scenarios.

use super::{DailyClose, MarketDataProvider, ProviderError};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider backed by fixed series keyed by ticker
#[derive(Debug, Default)]
pub struct StaticProvider {
    series: HashMap<String, Vec<DailyClose>>,
    fetches: AtomicUsize,
}

impl StaticProvider {
    /// Provider with no data: every lookup returns an empty series
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add one close for a ticker
    pub fn with_close(mut self, ticker: &str, date: NaiveDate, close: Decimal) -> Self {
        self.insert(ticker, date, close);
        self
    }

    /// Add a close for every calendar day in `[start, end]`
    pub fn with_constant(
        mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        close: Decimal,
    ) -> Self {
        for date in start.iter_days().take_while(|d| *d <= end) {
            self.insert(ticker, date, close);
        }
        self
    }

    pub fn insert(&mut self, ticker: &str, date: NaiveDate, close: Decimal) {
        let series = self.series.entry(ticker.to_string()).or_default();
        series.retain(|c| c.date != date);
        series.push(DailyClose { date, close });
        series.sort_by_key(|c| c.date);
    }

    /// Number of `history` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .series
            .get(ticker)
            .map(|s| {
                s.iter()
                    .filter(|c| c.date >= start && c.date <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}
