//! Trading cost model
//!
//! Commission, slippage and spread are all proportional to notional and
//! charged identically on buys and sells.

use crate::config::CostConfig;
use rust_decimal::Decimal;

/// Proportional trading cost model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    pub commission_rate: Decimal,
    pub slippage_rate: Decimal,
    pub spread_rate: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::from_config(&CostConfig::default())
    }
}

impl CostModel {
    pub fn from_config(config: &CostConfig) -> Self {
        Self {
            commission_rate: config.commission_rate,
            slippage_rate: config.slippage_rate,
            spread_rate: config.spread_rate,
        }
    }

    /// Combined cost rate
    pub fn total_rate(&self) -> Decimal {
        self.commission_rate + self.slippage_rate + self.spread_rate
    }

    /// Cost of trading `notional`
    pub fn trading_cost(&self, notional: Decimal) -> Decimal {
        notional * self.total_rate()
    }
}
