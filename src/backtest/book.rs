//! Per-currency holdings and cash

use crate::accounting::{portfolio_value, Holdings, PriceMap};
use crate::pricing::Currency;
use rust_decimal::Decimal;

/// Holdings and cash of one currency bucket, in its native currency
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyBook {
    currency: Currency,
    holdings: Holdings,
    cash: Decimal,
}

impl CurrencyBook {
    pub fn new(currency: Currency, cash: Decimal) -> Self {
        Self {
            currency,
            holdings: Holdings::new(),
            cash,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Shares held of `symbol`, zero if not held
    pub fn shares(&self, symbol: &str) -> Decimal {
        self.holdings.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// Native-currency value of the priced holdings
    pub fn holdings_value(&self, prices: &PriceMap) -> Decimal {
        portfolio_value(&self.holdings, prices, None)
    }

    /// Remove up to `shares` and credit `net_proceeds`. Returns the shares removed.
    pub fn sell(&mut self, symbol: &str, shares: Decimal, net_proceeds: Decimal) -> Decimal {
        let held = self.shares(symbol);
        let sold = shares.min(held);
        let remaining = held - sold;
        if remaining > Decimal::ZERO {
            self.holdings.insert(symbol.to_string(), remaining);
        } else {
            self.holdings.remove(symbol);
        }
        self.cash += net_proceeds;
        sold
    }

    /// Add `shares` and debit `total_cost`. Refused when cash would go negative.
    pub fn buy(&mut self, symbol: &str, shares: Decimal, total_cost: Decimal) -> bool {
        if shares <= Decimal::ZERO || total_cost > self.cash {
            return false;
        }
        *self.holdings.entry(symbol.to_string()).or_insert(Decimal::ZERO) += shares;
        self.cash -= total_cost;
        true
    }
}
