//! Risk and reporting module
//!
//! Return, volatility, Sharpe and drawdown statistics over the daily value
//! series, plus monthly and yearly P&L aggregation.

mod metrics;
mod periods;

pub use metrics::{RiskMetrics, DAILY_RETURN_CLAMP};
pub use periods::{
    cumulative_returns, monthly_calendar, monthly_pnl, period_pnl, yearly_summary,
    CumulativeReturn, MonthlyCalendar, MonthlySummaryRow, PeriodPnl,
};
