//! Backtest analytics and reporting

use super::{RunStats, SimulationResult};
use crate::accounting::{pnl_breakdown, DailyPnl};
use crate::execution::TradeAction;
use crate::risk::{
    cumulative_returns, monthly_calendar, CumulativeReturn, MonthlyCalendar, RiskMetrics,
};
use crate::telemetry::{set_gauge, GaugeMetric};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Summary statistics from a backtest
#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    /// First snapshot date
    pub start_date: Option<NaiveDate>,
    /// Last snapshot date
    pub end_date: Option<NaiveDate>,
    /// Initial capital in JPY
    pub initial_value: Decimal,
    /// Final total value in JPY
    pub final_value: Decimal,
    /// Final minus initial value
    pub net_pnl: Decimal,
    /// Net P&L against initial value, in percent
    pub net_pnl_pct: Decimal,
    /// Trading costs paid, in JPY
    pub total_trading_cost: Decimal,
    /// Number of buys
    pub buys: usize,
    /// Number of sells
    pub sells: usize,
    /// Days with a snapshot
    pub trading_days: usize,
    /// Risk statistics, absent for runs shorter than two days
    pub risk: Option<RiskMetrics>,
    /// Absorbed failures
    pub stats: RunStats,
}

impl BacktestSummary {
    pub fn from_result(result: &SimulationResult, risk_free_rate: f64) -> Self {
        let final_value = result.final_value().unwrap_or(result.initial_total_value);
        let net_pnl = final_value - result.initial_total_value;
        let net_pnl_pct = if result.initial_total_value > Decimal::ZERO {
            net_pnl / result.initial_total_value * dec!(100)
        } else {
            Decimal::ZERO
        };
        let buys = result
            .trades
            .iter()
            .filter(|t| t.action == TradeAction::Buy)
            .count();

        Self {
            start_date: result.snapshots.first().map(|s| s.date),
            end_date: result.snapshots.last().map(|s| s.date),
            initial_value: result.initial_total_value,
            final_value,
            net_pnl,
            net_pnl_pct,
            total_trading_cost: result.total_trading_cost(),
            buys,
            sells: result.trades.len() - buys,
            trading_days: result.snapshots.len(),
            risk: RiskMetrics::compute(&result.snapshots, result.trades.len(), risk_free_rate),
            stats: result.stats.clone(),
        }
    }

    /// Publish the headline figures as gauges
    pub fn publish_metrics(&self) {
        use rust_decimal::prelude::ToPrimitive;

        set_gauge(GaugeMetric::TotalValue, self.final_value.to_f64().unwrap_or(0.0));
        set_gauge(GaugeMetric::TotalReturnPct, self.net_pnl_pct.to_f64().unwrap_or(0.0));
        if let Some(risk) = &self.risk {
            set_gauge(GaugeMetric::MaxDrawdownPct, risk.max_drawdown_pct);
            set_gauge(GaugeMetric::SharpeRatio, risk.sharpe_ratio);
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let period = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!("{} .. {}", start, end),
            _ => "-".to_string(),
        };
        let risk = match &self.risk {
            Some(risk) => format!(
                r#"Annual Return:    {:+.2}%
Volatility:       {:.2}%
Sharpe Ratio:     {:.2}
Max Drawdown:     {:.2}%"#,
                risk.annual_return_pct,
                risk.annual_volatility_pct,
                risk.sharpe_ratio,
                risk.max_drawdown_pct,
            ),
            None => "Not enough data for risk metrics".to_string(),
        };

        format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════
Period:           {}

PERFORMANCE
───────────────────────────────────────────────────────
Initial Value:    {:.0} JPY
Final Value:      {:.0} JPY
Net P&L:          {:+.0} ({:+.2}%)
{}

ACTIVITY
───────────────────────────────────────────────────────
Trading Days:     {}
Rebalance Days:   {}
Total Trades:     {} ({} buys, {} sells)
Trading Costs:    {:.0} JPY

DATA QUALITY
───────────────────────────────────────────────────────
FX Skipped Days:  {}
Price Misses:     {}
Vote Failures:    {}
══════════════════════════════════════════════════════
"#,
            period,
            self.initial_value,
            self.final_value,
            self.net_pnl,
            self.net_pnl_pct,
            risk,
            self.trading_days,
            self.stats.rebalance_days,
            self.buys + self.sells,
            self.buys,
            self.sells,
            self.total_trading_cost,
            self.stats.fx_skipped_days,
            self.stats.price_misses,
            self.stats.vote_lookup_failures,
        )
    }
}

/// Post-run P&L attribution over the full simulation output
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    /// Realized, unrealized and residual P&L per snapshot day
    pub breakdown: Vec<DailyPnl>,
    /// Value and cumulative return per snapshot day
    pub performance: Vec<CumulativeReturn>,
    /// One calendar per month between the first and last snapshot
    pub calendars: Vec<MonthlyCalendar>,
}

impl BacktestReport {
    pub fn from_result(result: &SimulationResult) -> Self {
        let opening = result.initial_total_value;
        let breakdown = pnl_breakdown(&result.snapshots, &result.trades, opening);
        let performance = cumulative_returns(&result.snapshots, opening);

        let mut calendars = Vec::new();
        if let (Some(first), Some(last)) = (
            result.snapshots.iter().map(|s| s.date).min(),
            result.snapshots.iter().map(|s| s.date).max(),
        ) {
            let (mut year, mut month) = (first.year(), first.month());
            while (year, month) <= (last.year(), last.month()) {
                if let Some(calendar) =
                    monthly_calendar(&result.snapshots, &result.trades, opening, year, month)
                {
                    calendars.push(calendar);
                }
                (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
            }
        }

        Self {
            breakdown,
            performance,
            calendars,
        }
    }

    /// Monthly realized / unrealized / other totals for CLI output
    pub fn format_months(&self) -> String {
        let mut out = String::from("P&L ATTRIBUTION\n");
        out.push_str("───────────────────────────────────────────────────────\n");
        out.push_str("Month      Realized    Unrealized         Other\n");
        for calendar in &self.calendars {
            out.push_str(&format!(
                "{}-{:02} {:>+12.0} {:>+13.0} {:>+13.0}\n",
                calendar.year,
                calendar.month,
                calendar.realized_total,
                calendar.unrealized_total,
                calendar.other,
            ));
        }
        out
    }
}
