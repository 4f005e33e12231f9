//! Vote module
//!
//! Turns raw vote events into per-currency rankings and maps trade dates to
//! the vote dates that drive them.

mod aggregator;
mod calendar;

pub use aggregator::{RankedSymbol, VoteAggregator, VoteRanking};
pub use calendar::{is_weekend, next_business_day, trade_date_for, vote_date_for};

use crate::storage::StorageError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of votes cast for one code on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub symbol: String,
    pub count: u32,
}

/// Read-only source of vote counts
pub trait VoteStore: Send + Sync {
    /// Per-code vote counts for a vote date, in insertion order or by count
    fn votes_on(&self, date: NaiveDate) -> Result<Vec<VoteCount>, StorageError>;
}
