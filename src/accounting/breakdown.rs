//! Daily realized / unrealized P&L breakdown
//!
//! Replays the trade history against the snapshots. Each day reports the
//! change in cumulative realized and unrealized P&L; whatever part of the
//! valuation change those two do not explain (cash, FX drift on cash, trading
//! costs) is reported as `other`.

use super::CostBasisLedger;
use crate::backtest::DailySnapshot;
use crate::execution::TradeRecord;
use crate::pricing::Currency;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// P&L attributed to one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolPnl {
    pub symbol: String,
    pub pnl: Decimal,
}

/// P&L decomposition for one snapshot day, all in JPY
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPnl {
    pub date: NaiveDate,
    /// `realized_pnl + unrealized_pnl`
    pub total_pnl: Decimal,
    /// Change in cumulative realized P&L
    pub realized_pnl: Decimal,
    /// Change in cumulative unrealized P&L
    pub unrealized_pnl: Decimal,
    /// Realized P&L of the day's sells
    pub realized_detail: Vec<SymbolPnl>,
    /// Cumulative unrealized P&L per held symbol
    pub unrealized_detail: Vec<SymbolPnl>,
    pub daily_pnl_rate: Decimal,
    /// Change in total asset value against the previous day
    pub valuation_change: Decimal,
    /// `valuation_change - total_pnl`
    pub other: Decimal,
}

/// Break each snapshot day down into realized, unrealized and residual P&L.
///
/// `opening_value` is the total value before the first snapshot.
pub fn pnl_breakdown(
    snapshots: &[DailySnapshot],
    trades: &[TradeRecord],
    opening_value: Decimal,
) -> Vec<DailyPnl> {
    let mut snapshots: Vec<&DailySnapshot> = snapshots.iter().collect();
    snapshots.sort_by_key(|s| s.date);
    let mut trades: Vec<&TradeRecord> = trades.iter().collect();
    trades.sort_by_key(|t| t.date);

    let mut ledger = CostBasisLedger::new();
    let mut next_trade = 0;
    let mut prev_realized = Decimal::ZERO;
    let mut prev_unrealized = Decimal::ZERO;
    let mut prev_value = opening_value;
    let mut days = Vec::with_capacity(snapshots.len());

    for snapshot in snapshots {
        let mut realized_detail = Vec::new();
        while next_trade < trades.len() && trades[next_trade].date <= snapshot.date {
            let trade = trades[next_trade];
            if let Some(pnl) = ledger.apply(trade) {
                if trade.date == snapshot.date {
                    realized_detail.push(SymbolPnl {
                        symbol: trade.symbol.clone(),
                        pnl,
                    });
                }
            }
            next_trade += 1;
        }

        let mut unrealized = Decimal::ZERO;
        let mut unrealized_detail = Vec::new();
        for (symbol, position) in ledger.open_positions() {
            let Some(price) = snapshot.marks.get(symbol) else {
                continue;
            };
            let mut value = position.shares * price;
            if position.currency == Currency::Usd {
                value *= snapshot.exchange_rate;
            }
            let pnl = value - position.total_cost;
            unrealized += pnl;
            unrealized_detail.push(SymbolPnl {
                symbol: symbol.clone(),
                pnl,
            });
        }

        let realized_pnl = ledger.realized() - prev_realized;
        let unrealized_pnl = unrealized - prev_unrealized;
        let total_pnl = realized_pnl + unrealized_pnl;
        let valuation_change = snapshot.total_value - prev_value;

        days.push(DailyPnl {
            date: snapshot.date,
            total_pnl,
            realized_pnl,
            unrealized_pnl,
            realized_detail,
            unrealized_detail,
            daily_pnl_rate: snapshot.daily_pnl_rate,
            valuation_change,
            other: valuation_change - total_pnl,
        });

        prev_realized = ledger.realized();
        prev_unrealized = unrealized;
        prev_value = snapshot.total_value;
    }

    days
}
