//! Period P&L aggregation

use crate::accounting::{pnl_breakdown, DailyPnl};
use crate::backtest::DailySnapshot;
use crate::execution::TradeRecord;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// P&L of a date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodPnl {
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub amount: Decimal,
    /// `amount / start_value` in percent
    pub rate_pct: Decimal,
}

/// P&L over `[from, to]`.
///
/// The start value is the last snapshot strictly before `from`, or the first
/// snapshot in the range when the range opens the run. `None` when the range
/// has no snapshots or the start value is not positive.
pub fn period_pnl(snapshots: &[DailySnapshot], from: NaiveDate, to: NaiveDate) -> Option<PeriodPnl> {
    let mut in_range = snapshots.iter().filter(|s| s.date >= from && s.date <= to);
    let first = in_range.next()?;
    let last = in_range.last().unwrap_or(first);

    let start_value = snapshots
        .iter()
        .filter(|s| s.date < from)
        .max_by_key(|s| s.date)
        .map(|s| s.total_value)
        .unwrap_or(first.total_value);
    if start_value <= Decimal::ZERO {
        return None;
    }

    let amount = last.total_value - start_value;
    Some(PeriodPnl {
        start_value,
        end_value: last.total_value,
        amount,
        rate_pct: amount / start_value * dec!(100),
    })
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - Duration::days(1)))
}

/// P&L of one calendar month
pub fn monthly_pnl(snapshots: &[DailySnapshot], year: i32, month: u32) -> Option<PeriodPnl> {
    let (from, to) = month_bounds(year, month)?;
    period_pnl(snapshots, from, to)
}

/// One row of a yearly summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummaryRow {
    pub month: u32,
    /// `None` for months without snapshots
    pub pnl: Option<PeriodPnl>,
}

/// Twelve monthly rows for `year`
pub fn yearly_summary(snapshots: &[DailySnapshot], year: i32) -> Vec<MonthlySummaryRow> {
    (1..=12)
        .map(|month| MonthlySummaryRow {
            month,
            pnl: monthly_pnl(snapshots, year, month),
        })
        .collect()
}

/// Daily P&L calendar of one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCalendar {
    pub year: i32,
    pub month: u32,
    /// Breakdown rows for the month's snapshot days
    pub days: Vec<DailyPnl>,
    pub pnl: Option<PeriodPnl>,
    /// Sum of daily realized changes
    pub realized_total: Decimal,
    /// Sum of daily unrealized changes
    pub unrealized_total: Decimal,
    /// Month P&L not explained by realized and unrealized changes
    pub other: Decimal,
}

impl MonthlyCalendar {
    /// Monday-first week rows of day numbers, `None` outside the month
    pub fn weeks(&self) -> Vec<[Option<u32>; 7]> {
        let Some((first, last)) = month_bounds(self.year, self.month) else {
            return vec![];
        };
        let mut weeks = Vec::new();
        let mut week = [None; 7];
        for date in first.iter_days().take_while(|d| *d <= last) {
            let column = date.weekday().num_days_from_monday() as usize;
            week[column] = Some(date.day());
            if date.weekday() == Weekday::Sun {
                weeks.push(week);
                week = [None; 7];
            }
        }
        if week.iter().any(Option::is_some) {
            weeks.push(week);
        }
        weeks
    }

    pub fn day(&self, day: u32) -> Option<&DailyPnl> {
        self.days.iter().find(|d| d.date.day() == day)
    }
}

/// Calendar of daily P&L for one month; `None` when the month has no snapshots
pub fn monthly_calendar(
    snapshots: &[DailySnapshot],
    trades: &[TradeRecord],
    opening_value: Decimal,
    year: i32,
    month: u32,
) -> Option<MonthlyCalendar> {
    let (from, to) = month_bounds(year, month)?;
    let days: Vec<DailyPnl> = pnl_breakdown(snapshots, trades, opening_value)
        .into_iter()
        .filter(|d| d.date >= from && d.date <= to)
        .collect();
    if days.is_empty() {
        return None;
    }

    let pnl = period_pnl(snapshots, from, to);
    let realized_total: Decimal = days.iter().map(|d| d.realized_pnl).sum();
    let unrealized_total: Decimal = days.iter().map(|d| d.unrealized_pnl).sum();
    let other = pnl
        .map(|p| p.amount - (realized_total + unrealized_total))
        .unwrap_or(Decimal::ZERO);

    Some(MonthlyCalendar {
        year,
        month,
        days,
        pnl,
        realized_total,
        unrealized_total,
        other,
    })
}

/// Portfolio value and cumulative return against the initial investment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CumulativeReturn {
    pub date: NaiveDate,
    pub value: Decimal,
    pub return_pct: Decimal,
}

pub fn cumulative_returns(snapshots: &[DailySnapshot], initial_investment: Decimal) -> Vec<CumulativeReturn> {
    snapshots
        .iter()
        .map(|s| CumulativeReturn {
            date: s.date,
            value: s.total_value,
            return_pct: if initial_investment > Decimal::ZERO {
                (s.total_value - initial_investment) / initial_investment * dec!(100)
            } else {
                Decimal::ZERO
            },
        })
        .collect()
}
