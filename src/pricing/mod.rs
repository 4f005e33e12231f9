//! Price resolution module
//!
//! Resolves (symbol, date) pairs to daily closes and USD/JPY rates through a
//! two-tier cache (in-process memo, persistent store) backed by an external
//! time-series provider.

mod memo;
mod resolver;
mod static_series;
mod symbol;
mod yahoo;

pub use memo::PriceMemo;
pub use resolver::{PriceResolver, ResolverConfig, ResolverStats};
pub use static_series::StaticProvider;
pub use symbol::{Currency, PriceKind, Symbol};
pub use yahoo::{YahooClient, YahooConfig, YAHOO_API_URL};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily close from a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Market data provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status code
    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Error object in an otherwise successful response
    #[error("Provider error: {0}")]
    Api(String),
    /// Response body did not match the expected shape
    #[error("Malformed provider response: {0}")]
    Parse(String),
}

/// Trait for daily time-series providers
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily closes for `ticker` between `start` and `end` (inclusive), ascending.
    /// An unknown ticker or an empty window yields an empty series.
    async fn history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, ProviderError>;
}

/// Close of the latest series entry in `[date - lookback_days, date]`.
///
/// Carries the last known close across weekends and holidays, but never
/// further back than the lookback window.
pub fn as_of_close(series: &[DailyClose], date: NaiveDate, lookback_days: i64) -> Option<Decimal> {
    let earliest = date - Duration::days(lookback_days);
    series
        .iter()
        .filter(|c| c.date <= date && c.date >= earliest)
        .max_by_key(|c| c.date)
        .map(|c| c.close)
}

/// A value is plausible when it is positive and at most `ceiling`
pub fn is_plausible(value: Decimal, ceiling: Decimal) -> bool {
    value > Decimal::ZERO && value <= ceiling
}
