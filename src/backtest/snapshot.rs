//! Daily snapshots and run results

use crate::accounting::{Holdings, PriceMap};
use crate::execution::TradeRecord;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// End-of-day state of the portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    /// Vote date traded on this day, for rebalance days
    pub vote_date: Option<NaiveDate>,
    pub jpy_holdings: Holdings,
    pub usd_holdings: Holdings,
    /// JPY cash
    pub jpy_cash: Decimal,
    /// USD cash, in dollars
    pub usd_cash: Decimal,
    /// Total assets in JPY
    pub total_value: Decimal,
    /// JPY per USD used for the day
    pub exchange_rate: Decimal,
    /// Domestic holdings value in JPY
    pub jpy_portfolio_value: Decimal,
    /// Foreign holdings value converted to JPY
    pub usd_portfolio_value: Decimal,
    /// Trading costs of the day in JPY
    pub trading_cost: Decimal,
    /// Change against the previous snapshot in percent
    pub daily_pnl_rate: Decimal,
    pub is_rebalance_day: bool,
    /// Closes used to value the holdings, native currency
    pub marks: PriceMap,
}

impl DailySnapshot {
    /// USD cash converted to JPY
    pub fn usd_cash_jpy(&self) -> Decimal {
        self.usd_cash * self.exchange_rate
    }
}

/// Failures absorbed during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Symbol-days that could not be priced
    pub price_misses: u64,
    /// Weekdays skipped for lack of an FX rate
    pub fx_skipped_days: u64,
    /// Rebalance days whose vote lookup failed
    pub vote_lookup_failures: u64,
    /// Rebalance days processed
    pub rebalance_days: u64,
    /// Provider calls made by the resolver
    pub provider_fetches: u64,
    /// Lookups served by the persistent cache
    pub cache_hits: u64,
}

/// Output of a simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationResult {
    pub snapshots: Vec<DailySnapshot>,
    pub trades: Vec<TradeRecord>,
    /// Weekdays without an FX rate; absent from `snapshots`
    pub skipped_days: Vec<NaiveDate>,
    /// Initial JPY principal plus initial foreign principal in JPY
    pub initial_total_value: Decimal,
    pub stats: RunStats,
}

impl SimulationResult {
    pub fn final_value(&self) -> Option<Decimal> {
        self.snapshots.last().map(|s| s.total_value)
    }

    pub fn total_trading_cost(&self) -> Decimal {
        self.snapshots.iter().map(|s| s.trading_cost).sum()
    }
}
