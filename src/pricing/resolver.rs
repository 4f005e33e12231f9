//! Two-tier price resolver
//!
//! Lookup order for a (symbol, date) pair: in-process memo, persistent price
//! cache, then the market data provider over a window of `lookback_days` on
//! each side of the date. Provider values are reduced to the latest close on
//! or before the date, checked for plausibility, then written back to both
//! tiers. Every failure degrades to `None`.

use super::{
    as_of_close, is_plausible, DailyClose, MarketDataProvider, PriceKind, PriceMemo, Symbol,
};
use crate::config::Config;
use crate::storage::PriceCache;
use crate::telemetry::{increment_counter, CounterMetric};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Calendar days searched around the target date
    pub lookback_days: i64,
    /// Upper bound for a plausible share price
    pub max_price: Decimal,
    /// Upper bound for a plausible JPY per USD rate
    pub max_fx_rate: Decimal,
    /// Provider ticker of the FX rate
    pub fx_symbol: String,
    /// Suffix appended to domestic codes for the provider
    pub domestic_suffix: String,
    /// Memo capacity in entries
    pub memo_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ResolverConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lookback_days: config.provider.lookback_days,
            max_price: config.provider.max_price,
            max_fx_rate: config.provider.max_fx_rate,
            fx_symbol: config.provider.fx_symbol.clone(),
            domestic_suffix: config.provider.domestic_suffix.clone(),
            memo_capacity: config.storage.memo_capacity,
        }
    }
}

/// Lookup counters for one resolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Served from the in-process memo
    pub memo_hits: u64,
    /// Served from the persistent cache
    pub cache_hits: u64,
    /// Provider calls made
    pub provider_fetches: u64,
    /// Lookups that ended without a usable value
    pub misses: u64,
}

/// Resolves daily closes and FX rates through memo, cache and provider
pub struct PriceResolver {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<dyn PriceCache>,
    memo: PriceMemo,
    config: ResolverConfig,
    stats: ResolverStats,
    /// Keys whose full range has already been fetched
    prefetched: HashSet<String>,
}

impl PriceResolver {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<dyn PriceCache>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            memo: PriceMemo::new(config.memo_capacity),
            config,
            stats: ResolverStats::default(),
            prefetched: HashSet::new(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Provider ticker for a symbol: domestic codes get the exchange suffix
    pub fn provider_ticker(&self, symbol: &Symbol) -> String {
        if symbol.is_domestic() && !symbol.code().contains('.') {
            format!("{}{}", symbol.code(), self.config.domestic_suffix)
        } else {
            symbol.code().to_string()
        }
    }

    /// Close of `symbol` on `date` in its native currency
    pub async fn resolve_price(&mut self, symbol: &Symbol, date: NaiveDate) -> Option<Decimal> {
        let ticker = self.provider_ticker(symbol);
        let lookup = Lookup {
            cache_key: symbol.code().to_string(),
            ticker,
            kind: PriceKind::Equity(symbol.currency()),
            ceiling: self.config.max_price,
        };
        self.resolve(&lookup, date).await
    }

    /// JPY per USD on `date`
    pub async fn resolve_fx_rate(&mut self, date: NaiveDate) -> Option<Decimal> {
        let lookup = self.fx_lookup();
        self.resolve(&lookup, date).await
    }

    /// Fetch a symbol's whole range once and seed both cache tiers
    pub async fn prefetch(&mut self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) {
        let lookup = Lookup {
            cache_key: symbol.code().to_string(),
            ticker: self.provider_ticker(symbol),
            kind: PriceKind::Equity(symbol.currency()),
            ceiling: self.config.max_price,
        };
        self.prefetch_range(&lookup, start, end).await;
    }

    /// Fetch the FX series for the whole range once
    pub async fn prefetch_fx(&mut self, start: NaiveDate, end: NaiveDate) {
        let lookup = self.fx_lookup();
        self.prefetch_range(&lookup, start, end).await;
    }

    fn fx_lookup(&self) -> Lookup {
        Lookup {
            cache_key: self.config.fx_symbol.clone(),
            ticker: self.config.fx_symbol.clone(),
            kind: PriceKind::Fx,
            ceiling: self.config.max_fx_rate,
        }
    }

    async fn resolve(&mut self, lookup: &Lookup, date: NaiveDate) -> Option<Decimal> {
        if let Some(memoized) = self.memo.get(&lookup.cache_key, date) {
            self.stats.memo_hits += 1;
            return memoized;
        }

        match self.cache.get(&lookup.cache_key, date) {
            Ok(Some(price)) => {
                self.stats.cache_hits += 1;
                increment_counter(CounterMetric::CacheHits, 1);
                tracing::debug!(symbol = %lookup.cache_key, %date, %price, "Price cache hit");
                self.memo.insert(&lookup.cache_key, date, Some(price));
                return Some(price);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(symbol = %lookup.cache_key, %date, error = %e, "Price cache read failed");
            }
        }

        let window = Duration::days(self.config.lookback_days);
        let series = self.fetch(lookup, date - window, date + window).await;
        let value = as_of_close(&series, date, self.config.lookback_days)
            .filter(|v| is_plausible(*v, lookup.ceiling));

        match value {
            Some(price) => self.store(lookup, date, price),
            None => {
                self.stats.misses += 1;
                tracing::debug!(symbol = %lookup.cache_key, %date, "No usable price");
                self.memo.insert(&lookup.cache_key, date, None);
            }
        }
        value
    }

    async fn prefetch_range(&mut self, lookup: &Lookup, start: NaiveDate, end: NaiveDate) {
        if start > end || !self.prefetched.insert(lookup.cache_key.clone()) {
            return;
        }

        let lookback = self.config.lookback_days;
        let series = self
            .fetch(lookup, start - Duration::days(lookback), end)
            .await;
        if series.is_empty() {
            return;
        }

        let mut seeded = 0usize;
        for date in start.iter_days().take_while(|d| *d <= end) {
            match as_of_close(&series, date, lookback).filter(|v| is_plausible(*v, lookup.ceiling)) {
                Some(price) => {
                    self.store(lookup, date, price);
                    seeded += 1;
                }
                // keep an earlier run's cached value reachable
                None => {
                    if let Ok(cached) = self.cache.get(&lookup.cache_key, date) {
                        self.memo.insert(&lookup.cache_key, date, cached);
                    }
                }
            }
        }

        tracing::debug!(symbol = %lookup.cache_key, %start, %end, seeded, "Prefetched series");
    }

    async fn fetch(&mut self, lookup: &Lookup, start: NaiveDate, end: NaiveDate) -> Vec<DailyClose> {
        self.stats.provider_fetches += 1;
        increment_counter(CounterMetric::ProviderFetches, 1);

        match self.provider.history(&lookup.ticker, start, end).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(ticker = %lookup.ticker, %start, %end, error = %e, "Provider lookup failed");
                vec![]
            }
        }
    }

    fn store(&mut self, lookup: &Lookup, date: NaiveDate, price: Decimal) {
        self.memo.insert(&lookup.cache_key, date, Some(price));
        if let Err(e) = self.cache.put(&lookup.cache_key, date, price, lookup.kind) {
            tracing::warn!(symbol = %lookup.cache_key, %date, error = %e, "Price cache write failed");
        }
    }
}

/// One resolvable series
struct Lookup {
    /// Key in the memo and persistent cache (raw code or FX ticker)
    cache_key: String,
    /// Key sent to the provider
    ticker: String,
    kind: PriceKind,
    ceiling: Decimal,
}

impl std::fmt::Debug for PriceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceResolver")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("memo_len", &self.memo.len())
            .finish()
    }
}
