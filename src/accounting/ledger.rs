//! Moving-average cost basis ledger
//!
//! Costs are tracked in JPY. USD trades are converted at the rate recorded on
//! the trade. Trading costs are not capitalized into the basis.

use crate::execution::{TradeAction, TradeRecord};
use crate::pricing::Currency;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Shares and total JPY cost of one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPosition {
    pub shares: Decimal,
    pub total_cost: Decimal,
    pub currency: Currency,
}

impl LedgerPosition {
    /// Average JPY cost per share
    pub fn average_cost(&self) -> Decimal {
        if self.shares > Decimal::ZERO {
            self.total_cost / self.shares
        } else {
            Decimal::ZERO
        }
    }
}

/// Cost basis per symbol plus cumulative realized P&L
#[derive(Debug, Clone, Default)]
pub struct CostBasisLedger {
    positions: BTreeMap<String, LedgerPosition>,
    realized: Decimal,
}

impl CostBasisLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a trade. Returns the realized P&L for sells of a held symbol.
    pub fn apply(&mut self, trade: &TradeRecord) -> Option<Decimal> {
        let value = trade.value_jpy();
        let position = self
            .positions
            .entry(trade.symbol.clone())
            .or_insert(LedgerPosition {
                shares: Decimal::ZERO,
                total_cost: Decimal::ZERO,
                currency: trade.currency,
            });

        match trade.action {
            TradeAction::Buy => {
                position.shares += trade.shares;
                position.total_cost += value;
                None
            }
            TradeAction::Sell => {
                if position.shares <= Decimal::ZERO || trade.shares <= Decimal::ZERO {
                    return None;
                }
                // oversized sells only realize against the shares held
                let sold = trade.shares.min(position.shares);
                let proceeds = if sold < trade.shares {
                    value * sold / trade.shares
                } else {
                    value
                };
                let pnl = proceeds - position.average_cost() * sold;
                let remaining_ratio = Decimal::ONE - sold / position.shares;
                position.shares -= sold;
                position.total_cost *= remaining_ratio;
                self.realized += pnl;
                Some(pnl)
            }
        }
    }

    /// Cumulative realized P&L in JPY
    pub fn realized(&self) -> Decimal {
        self.realized
    }

    pub fn position(&self, symbol: &str) -> Option<&LedgerPosition> {
        self.positions.get(symbol)
    }

    /// Positions with shares still held
    pub fn open_positions(&self) -> impl Iterator<Item = (&String, &LedgerPosition)> {
        self.positions.iter().filter(|(_, p)| p.shares > Decimal::ZERO)
    }
}
