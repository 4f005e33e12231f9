//! Price resolution integration tests

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use vote_backtest::pricing::{PriceResolver, ResolverConfig, StaticProvider, Symbol};
use vote_backtest::storage::{MemoryStore, PriceCache, SqliteStore};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn toyota() -> Symbol {
    Symbol::parse("7203").unwrap()
}

#[tokio::test]
async fn test_second_resolver_is_served_by_the_cache() {
    let provider = Arc::new(StaticProvider::empty().with_close("7203.T", date(5), dec!(2500)));
    let store = Arc::new(MemoryStore::new());

    let mut first = PriceResolver::new(provider.clone(), store.clone(), ResolverConfig::default());
    // Saturday carries Friday's close
    assert_eq!(first.resolve_price(&toyota(), date(6)).await, Some(dec!(2500)));
    assert_eq!(first.resolve_price(&toyota(), date(6)).await, Some(dec!(2500)));
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(first.stats().memo_hits, 1);

    let mut second = PriceResolver::new(provider.clone(), store.clone(), ResolverConfig::default());
    assert_eq!(second.resolve_price(&toyota(), date(6)).await, Some(dec!(2500)));
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(second.stats().cache_hits, 1);
    assert_eq!(store.get("7203", date(6)).unwrap(), Some(dec!(2500)));
}

#[tokio::test]
async fn test_implausible_values_are_rejected_once() {
    let provider = Arc::new(
        StaticProvider::empty()
            .with_close("7203.T", date(8), dec!(2000000))
            .with_close("USDJPY=X", date(8), dec!(1500)),
    );
    let store = Arc::new(MemoryStore::new());
    let mut resolver = PriceResolver::new(provider.clone(), store.clone(), ResolverConfig::default());

    assert_eq!(resolver.resolve_price(&toyota(), date(8)).await, None);
    assert_eq!(resolver.resolve_fx_rate(date(8)).await, None);
    assert_eq!(provider.fetch_count(), 2);

    // Misses are memoized
    assert_eq!(resolver.resolve_price(&toyota(), date(8)).await, None);
    assert_eq!(provider.fetch_count(), 2);
    assert_eq!(resolver.stats().misses, 2);
    assert_eq!(store.cached_price_count(), 0);
}

#[tokio::test]
async fn test_foreign_ticker_has_no_suffix() {
    let provider = Arc::new(StaticProvider::empty().with_close("AAPL", date(8), dec!(185.5)));
    let mut resolver =
        PriceResolver::new(provider, Arc::new(MemoryStore::new()), ResolverConfig::default());

    let apple = Symbol::parse("AAPL").unwrap();
    assert_eq!(resolver.provider_ticker(&apple), "AAPL");
    assert_eq!(resolver.resolve_price(&apple, date(8)).await, Some(dec!(185.5)));
}

#[tokio::test]
async fn test_sqlite_cache_persists_across_opens() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("prices.db");

    {
        let provider = Arc::new(
            StaticProvider::empty()
                .with_constant("7203.T", date(1), date(12), dec!(2500))
                .with_constant("USDJPY=X", date(1), date(12), dec!(145.5)),
        );
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let mut resolver = PriceResolver::new(provider, store.clone(), ResolverConfig::default());
        resolver.prefetch(&toyota(), date(8), date(12)).await;
        resolver.prefetch_fx(date(8), date(12)).await;
        assert_eq!(store.cached_price_count().unwrap(), 10);
    }

    // Offline: an empty provider must not be needed
    let provider = Arc::new(StaticProvider::empty());
    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let mut resolver = PriceResolver::new(provider.clone(), store, ResolverConfig::default());

    assert_eq!(resolver.resolve_price(&toyota(), date(10)).await, Some(dec!(2500)));
    assert_eq!(resolver.resolve_fx_rate(date(11)).await, Some(dec!(145.5)));
    assert_eq!(provider.fetch_count(), 0);
}
