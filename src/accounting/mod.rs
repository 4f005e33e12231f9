//! Accounting module
//!
//! Mark-to-market valuation, moving-average cost basis and the daily
//! realized/unrealized P&L breakdown.

mod breakdown;
mod ledger;
mod valuation;

pub use breakdown::{pnl_breakdown, DailyPnl, SymbolPnl};
pub use ledger::{CostBasisLedger, LedgerPosition};
pub use valuation::{
    daily_pnl_rate, portfolio_value, total_asset_value, Holdings, PriceMap, MAX_POSITION_VALUE,
};
