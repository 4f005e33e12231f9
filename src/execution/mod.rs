//! Execution module
//!
//! Trade records and the trading cost model

mod costs;
mod types;

pub use costs::CostModel;
pub use types::{TradeAction, TradeRecord};
