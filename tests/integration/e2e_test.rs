//! End-to-end integration tests

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use vote_backtest::accounting::pnl_breakdown;
use vote_backtest::backtest::{
    BacktestReport, BacktestSummary, Rebalancer, SimulationParams, Simulator,
};
use vote_backtest::config::{Config, OutputFormat, DEFAULT_ALLOCATION};
use vote_backtest::data::{ParquetReader, ResultWriter};
use vote_backtest::pricing::{PriceResolver, ResolverConfig, StaticProvider};
use vote_backtest::risk::{cumulative_returns, yearly_summary};
use vote_backtest::storage::SqliteStore;
use vote_backtest::votes::VoteAggregator;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

#[test]
fn test_config_example_loads() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.simulation.start_date, Some(date(1, 1)));
    assert_eq!(config.simulation.jpy_allocation, DEFAULT_ALLOCATION);
    assert_eq!(config.costs.commission_rate, dec!(0.001));
    assert_eq!(config.provider.fx_symbol, "USDJPY=X");
    assert_eq!(config.export.format, OutputFormat::Table);
    assert!(config.telemetry.metrics_port.is_none());
}

#[tokio::test]
async fn test_sqlite_backed_run_and_export() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_dir.path().join("votes.db")).unwrap());

    // Two weeks of votes; Saturday votes trade Monday, Tuesday votes trade Wednesday
    store.record_vote(date(1, 6), "7203", 3).unwrap();
    store.record_vote(date(1, 6), "AAPL", 2).unwrap();
    store.record_vote(date(1, 9), "6758", 4).unwrap();
    store.record_vote(date(1, 13), "6758", 1).unwrap();
    store.record_vote(date(1, 13), "AAPL", 1).unwrap();
    store.upsert_name("7203", "Toyota Motor").unwrap();

    let mut provider = StaticProvider::empty()
        .with_constant("USDJPY=X", date(1, 1), date(1, 31), dec!(145))
        .with_constant("6758.T", date(1, 1), date(1, 31), dec!(13000))
        .with_constant("AAPL", date(1, 1), date(1, 31), dec!(185));
    for (day, close) in [(5, 2500), (8, 2550), (9, 2600), (10, 2580), (11, 2620), (12, 2700)] {
        provider.insert("7203.T", date(1, day), close.into());
    }

    let config = Config::default();
    let resolver = PriceResolver::new(Arc::new(provider), store.clone(), ResolverConfig::from_config(&config));
    let mut simulator = Simulator::new(
        resolver,
        VoteAggregator::new(store.clone(), config.simulation.top_n),
        store.clone(),
        Rebalancer::from_config(&config),
    );

    let params = SimulationParams::new(
        date(1, 8),
        date(1, 19),
        dec!(1000000),
        dec!(1000000),
        DEFAULT_ALLOCATION,
        DEFAULT_ALLOCATION,
    )
    .unwrap();
    let result = simulator.run(&params).await.unwrap();

    assert_eq!(result.snapshots.len(), 10);
    assert!(store.cached_price_count().unwrap() > 0);
    let toyota = result.trades.iter().find(|t| t.symbol == "7203").unwrap();
    assert_eq!(toyota.display_name, "Toyota Motor");
    let apple = result.trades.iter().find(|t| t.symbol == "AAPL").unwrap();
    assert_eq!(apple.display_name, "AAPL");

    // Breakdown reconciles with the valuation series
    let days = pnl_breakdown(&result.snapshots, &result.trades, result.initial_total_value);
    assert_eq!(days.len(), result.snapshots.len());
    for day in &days {
        assert_eq!(day.total_pnl + day.other, day.valuation_change);
    }

    let summary = BacktestSummary::from_result(&result, config.simulation.risk_free_rate);
    assert_eq!(summary.trading_days, 10);
    assert_eq!(summary.buys + summary.sells, result.trades.len());
    let risk = summary.risk.as_ref().unwrap();
    assert_eq!(risk.days, 10);
    assert!(risk.max_drawdown_pct >= 0.0);
    assert!(summary.format_table().contains("BACKTEST RESULTS"));

    let january = &yearly_summary(&result.snapshots, 2024)[0];
    assert_eq!(january.pnl.unwrap().end_value, summary.final_value);
    let series = cumulative_returns(&result.snapshots, result.initial_total_value);
    assert_eq!(series.last().unwrap().value, summary.final_value);

    let report = BacktestReport::from_result(&result);
    assert_eq!(report.calendars.len(), 1);
    assert_eq!(report.calendars[0].pnl.unwrap().end_value, summary.final_value);

    let writer = ResultWriter::new(temp_dir.path().join("output"));
    let written = writer
        .export(&result, &summary, &report, Utc::now(), true)
        .unwrap();
    assert_eq!(written.len(), 7);

    // Exported breakdown carries one row per snapshot with the attribution split
    let breakdown_file = written
        .iter()
        .find(|p| p.to_string_lossy().contains("pnl_breakdown_"))
        .unwrap();
    let breakdown: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(breakdown_file).unwrap()).unwrap();
    let rows = breakdown.as_array().unwrap();
    assert_eq!(rows.len(), result.snapshots.len());
    for row in rows {
        assert!(row.get("realized_pnl").is_some());
        assert!(row.get("unrealized_pnl").is_some());
        assert!(row.get("other").is_some());
    }

    let snapshot_file = written
        .iter()
        .find(|p| p.to_string_lossy().contains("snapshots_"))
        .unwrap();
    let values = ParquetReader::new(snapshot_file.clone())
        .read_snapshot_values()
        .unwrap();
    assert_eq!(values.len(), 10);
    assert_eq!(values.last().unwrap().1, summary.final_value);
}
