//! Execution types

use crate::pricing::Currency;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executed trade. Trade history is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Trade identifier
    pub id: Uuid,
    /// Execution date
    pub date: NaiveDate,
    /// Vote date that drove the rebalance
    pub vote_date: NaiveDate,
    /// Stock code
    pub symbol: String,
    /// Display name (falls back to the code)
    pub display_name: String,
    /// Buy or sell
    pub action: TradeAction,
    /// Shares traded, always positive
    pub shares: Decimal,
    /// Execution price in the trade currency
    pub price: Decimal,
    /// Notional value (`shares * price`) in the trade currency
    pub value: Decimal,
    /// Trade currency
    pub currency: Currency,
    /// JPY per USD at execution, present for USD trades only
    pub exchange_rate: Option<Decimal>,
}

impl TradeRecord {
    /// Notional value converted to JPY
    pub fn value_jpy(&self) -> Decimal {
        match (self.currency, self.exchange_rate) {
            (Currency::Usd, Some(fx)) => self.value * fx,
            _ => self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(currency: Currency, exchange_rate: Option<Decimal>) -> TradeRecord {
        TradeRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            vote_date: NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            symbol: "AAPL".to_string(),
            display_name: "Apple".to_string(),
            action: TradeAction::Buy,
            shares: dec!(10),
            price: dec!(180),
            value: dec!(1800),
            currency,
            exchange_rate,
        }
    }

    #[test]
    fn test_value_jpy_converts_usd() {
        assert_eq!(trade(Currency::Usd, Some(dec!(150))).value_jpy(), dec!(270000));
        assert_eq!(trade(Currency::Jpy, None).value_jpy(), dec!(1800));
    }

    #[test]
    fn test_action_serializes_uppercase() {
        let json = serde_json::to_value(trade(Currency::Usd, Some(dec!(150)))).unwrap();
        assert_eq!(json["action"], "BUY");
        assert_eq!(json["currency"], "USD");
    }
}
