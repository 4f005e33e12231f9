//! Simulation integration tests
//!
//! Drives the full simulator against a scripted provider and an in-memory
//! vote store.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use vote_backtest::backtest::{Rebalancer, SimulationParams, SimulationResult, Simulator};
use vote_backtest::execution::TradeAction;
use vote_backtest::pricing::{Currency, PriceResolver, ResolverConfig, StaticProvider};
use vote_backtest::storage::MemoryStore;
use vote_backtest::votes::VoteAggregator;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

async fn run(
    provider: StaticProvider,
    store: MemoryStore,
    params: &SimulationParams,
) -> SimulationResult {
    let store = Arc::new(store);
    let resolver = PriceResolver::new(Arc::new(provider), store.clone(), ResolverConfig::default());
    let mut simulator = Simulator::new(
        resolver,
        VoteAggregator::new(store.clone(), 10),
        store,
        Rebalancer::default(),
    );
    simulator.run(params).await.unwrap()
}

fn all_in() -> [u8; 10] {
    [100, 0, 0, 0, 0, 0, 0, 0, 0, 0]
}

#[tokio::test]
async fn test_single_symbol_round_trip() {
    // Monday trades Saturday's votes; Wednesday trades Tuesday's (none)
    let provider = StaticProvider::empty()
        .with_constant("USDJPY=X", date(1), date(31), dec!(150))
        .with_constant("1234.T", date(1), date(31), dec!(1000));
    let store = MemoryStore::new().with_votes(date(6), "1234", 5);
    let params =
        SimulationParams::new(date(8), date(10), dec!(1000000), dec!(0), all_in(), all_in()).unwrap();

    let result = run(provider, store, &params).await;
    assert_eq!(result.snapshots.len(), 3);

    let monday = &result.snapshots[0];
    assert!(monday.is_rebalance_day);
    assert_eq!(monday.jpy_holdings.get("1234"), Some(&dec!(998)));
    assert_eq!(monday.jpy_cash, dec!(303.4));
    assert_eq!(monday.trading_cost, dec!(1696.6));
    assert_eq!(monday.total_value, dec!(998303.4));

    let tuesday = &result.snapshots[1];
    assert!(!tuesday.is_rebalance_day);
    assert_eq!(tuesday.jpy_holdings, monday.jpy_holdings);

    let wednesday = &result.snapshots[2];
    assert!(wednesday.jpy_holdings.is_empty());
    assert_eq!(wednesday.jpy_cash, dec!(996606.8));

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].action, TradeAction::Buy);
    assert_eq!(result.trades[0].vote_date, date(6));
    assert_eq!(result.trades[1].action, TradeAction::Sell);
    assert_eq!(result.trades[1].shares, dec!(998));
    assert_eq!(result.stats.rebalance_days, 2);
}

#[tokio::test]
async fn test_missing_fx_days_are_skipped() {
    // Rate gap longer than the lookback window
    let provider = StaticProvider::empty()
        .with_constant("USDJPY=X", date(1), date(5), dec!(150))
        .with_constant("USDJPY=X", date(15), date(31), dec!(151));
    let params =
        SimulationParams::new(date(8), date(15), dec!(1000000), dec!(0), all_in(), all_in()).unwrap();

    let result = run(provider, MemoryStore::new(), &params).await;

    let dates: Vec<NaiveDate> = result.snapshots.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![date(8), date(15)]);
    assert_eq!(result.skipped_days, vec![date(9), date(10), date(11), date(12)]);
    assert_eq!(result.stats.fx_skipped_days, 4);
    assert_eq!(result.snapshots[1].exchange_rate, dec!(151));
}

#[tokio::test]
async fn test_rebalance_days_are_mondays_and_wednesdays() {
    // Three weeks of votes with an FX gap swallowing Wednesday the 17th
    let provider = StaticProvider::empty()
        .with_constant("USDJPY=X", date(1), date(12), dec!(150))
        .with_constant("USDJPY=X", date(19), date(31), dec!(150))
        .with_constant("1234.T", date(1), date(31), dec!(1000));
    let store = MemoryStore::new()
        .with_votes(date(6), "1234", 3)
        .with_votes(date(13), "1234", 2)
        .with_votes(date(20), "1234", 4)
        .with_votes(date(23), "1234", 1);
    let params =
        SimulationParams::new(date(8), date(26), dec!(1000000), dec!(0), all_in(), all_in()).unwrap();

    let result = run(provider, store, &params).await;
    assert_eq!(result.skipped_days, vec![date(16), date(17), date(18)]);

    let rebalance_dates: Vec<NaiveDate> = result
        .snapshots
        .iter()
        .filter(|s| s.is_rebalance_day)
        .map(|s| s.date)
        .collect();
    assert_eq!(rebalance_dates, vec![date(8), date(10), date(15), date(22), date(24)]);
    assert_eq!(result.stats.rebalance_days, 5);

    for snapshot in &result.snapshots {
        let mon_or_wed = matches!(snapshot.date.weekday(), Weekday::Mon | Weekday::Wed);
        assert_eq!(snapshot.is_rebalance_day, mon_or_wed, "{}", snapshot.date);
        assert_eq!(snapshot.vote_date.is_some(), mon_or_wed);
    }
}

fn mixed_market() -> (StaticProvider, MemoryStore) {
    let provider = StaticProvider::empty()
        .with_constant("USDJPY=X", date(1), date(31), dec!(150))
        .with_constant("7203.T", date(1), date(31), dec!(2500))
        .with_constant("1234.T", date(1), date(31), dec!(1000))
        .with_constant("9984.T", date(1), date(31), dec!(7300))
        .with_constant("AAPL", date(1), date(31), dec!(185.5))
        .with_constant("MSFT", date(1), date(31), dec!(375.25));
    let store = MemoryStore::new()
        .with_votes(date(6), "7203", 5)
        .with_votes(date(6), "1234", 2)
        .with_votes(date(6), "AAPL", 3)
        .with_votes(date(6), "MSFT", 1)
        .with_votes(date(9), "9984", 4)
        .with_votes(date(9), "7203", 1)
        .with_votes(date(9), "MSFT", 6);
    (provider, store)
}

#[tokio::test]
async fn test_value_conserved_up_to_costs_at_constant_prices() {
    let (provider, store) = mixed_market();
    let params = SimulationParams::new(
        date(8),
        date(19),
        dec!(1000000),
        dec!(1500000),
        [25, 20, 15, 10, 5, 5, 5, 5, 5, 5],
        [25, 20, 15, 10, 5, 5, 5, 5, 5, 5],
    )
    .unwrap();

    let result = run(provider, store, &params).await;
    assert!(!result.trades.is_empty());
    assert_eq!(result.initial_total_value, dec!(2500000));

    let mut costs = Decimal::ZERO;
    for snapshot in &result.snapshots {
        costs += snapshot.trading_cost;
        assert_eq!(snapshot.total_value + costs, dec!(2500000), "on {}", snapshot.date);
    }
    assert_eq!(result.total_trading_cost(), costs);
}

#[tokio::test]
async fn test_cash_never_negative() {
    let (provider, store) = mixed_market();
    let params = SimulationParams::new(
        date(8),
        date(19),
        dec!(1000000),
        dec!(1500000),
        [60, 60, 60, 0, 0, 0, 0, 0, 0, 0],
        [100, 100, 0, 0, 0, 0, 0, 0, 0, 0],
    )
    .unwrap();

    let result = run(provider, store, &params).await;
    assert!(!result.snapshots.is_empty());
    for snapshot in &result.snapshots {
        assert!(snapshot.jpy_cash >= Decimal::ZERO, "JPY cash on {}", snapshot.date);
        assert!(snapshot.usd_cash >= Decimal::ZERO, "USD cash on {}", snapshot.date);
    }
}

#[tokio::test]
async fn test_foreign_trades_carry_exchange_rate() {
    let (provider, store) = mixed_market();
    let params =
        SimulationParams::new(date(8), date(8), dec!(0), dec!(1500000), all_in(), all_in()).unwrap();

    let result = run(provider, store, &params).await;
    let aapl = result
        .trades
        .iter()
        .find(|t| t.symbol == "AAPL")
        .expect("AAPL bought");
    assert_eq!(aapl.exchange_rate, Some(dec!(150)));
    assert_eq!(aapl.value_jpy(), aapl.value * dec!(150));
    assert!(result.trades.iter().all(|t| t.currency == Currency::Usd));
}

#[tokio::test]
async fn test_unpriced_symbol_counts_a_miss() {
    let provider = StaticProvider::empty().with_constant("USDJPY=X", date(1), date(31), dec!(150));
    let store = MemoryStore::new().with_votes(date(6), "4444", 9);
    let params =
        SimulationParams::new(date(8), date(8), dec!(1000000), dec!(0), all_in(), all_in()).unwrap();

    let result = run(provider, store, &params).await;
    assert!(result.trades.is_empty());
    assert_eq!(result.snapshots[0].jpy_cash, dec!(1000000));
    assert_eq!(result.stats.price_misses, 1);
}
