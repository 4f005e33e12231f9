//! Prometheus metrics
//!
//! Counters for failures the simulation absorbs and gauges for the latest run.
//! Without an installed recorder these calls are no-ops.

use crate::execution::TradeAction;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Symbol-days that could not be priced
    PriceMisses,
    /// Days skipped for lack of an FX rate
    FxSkippedDays,
    /// Prices served from the persistent cache
    CacheHits,
    /// Calls made to the market data provider
    ProviderFetches,
    /// Vote lookups that failed and skipped a rebalance
    VoteLookupFailures,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Final total asset value in JPY
    TotalValue,
    /// Total return in percent
    TotalReturnPct,
    /// Maximum drawdown in percent
    MaxDrawdownPct,
    /// Annualized Sharpe ratio
    SharpeRatio,
}

impl CounterMetric {
    fn name(&self) -> &'static str {
        match self {
            CounterMetric::PriceMisses => "backtest_price_misses_total",
            CounterMetric::FxSkippedDays => "backtest_fx_skipped_days_total",
            CounterMetric::CacheHits => "backtest_cache_hits_total",
            CounterMetric::ProviderFetches => "backtest_provider_fetches_total",
            CounterMetric::VoteLookupFailures => "backtest_vote_lookup_failures_total",
        }
    }
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    ::metrics::counter!(metric.name()).increment(value);
}

/// Count one executed trade
pub fn record_trade(action: TradeAction) {
    ::metrics::counter!("backtest_trades_total", "action" => action.as_str()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::TotalValue => "backtest_total_value_jpy",
        GaugeMetric::TotalReturnPct => "backtest_total_return_pct",
        GaugeMetric::MaxDrawdownPct => "backtest_max_drawdown_pct",
        GaugeMetric::SharpeRatio => "backtest_sharpe_ratio",
    };

    tracing::debug!(metric = metric_name, value = value, "Setting gauge");
    ::metrics::gauge!(metric_name).set(value);
}
