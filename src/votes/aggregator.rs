//! Vote ranking
//!
//! Splits a date's vote counts into domestic and foreign buckets, each sorted
//! by count descending with ties kept in store order, truncated to `top_n`.

use super::VoteStore;
use crate::pricing::{Currency, Symbol};
use crate::storage::StorageError;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// A ranked symbol with its vote count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSymbol {
    pub symbol: Symbol,
    pub votes: u32,
}

/// Rankings for one vote date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteRanking {
    pub domestic: Vec<RankedSymbol>,
    pub foreign: Vec<RankedSymbol>,
}

impl VoteRanking {
    /// Ranking for one currency bucket
    pub fn bucket(&self, currency: Currency) -> &[RankedSymbol] {
        match currency {
            Currency::Jpy => &self.domestic,
            Currency::Usd => &self.foreign,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.domestic.is_empty() && self.foreign.is_empty()
    }
}

/// Builds rankings from a vote store
pub struct VoteAggregator {
    store: Arc<dyn VoteStore>,
    top_n: usize,
}

impl VoteAggregator {
    pub fn new(store: Arc<dyn VoteStore>, top_n: usize) -> Self {
        Self { store, top_n }
    }

    /// Split ranking for `vote_date`
    pub fn vote_results(&self, vote_date: NaiveDate) -> Result<VoteRanking, StorageError> {
        let mut votes = self.store.votes_on(vote_date)?;
        // stable: equal counts keep store order
        votes.sort_by(|a, b| b.count.cmp(&a.count));

        let mut ranking = VoteRanking::default();
        for vote in votes {
            let Some(symbol) = Symbol::parse(&vote.symbol) else {
                continue;
            };
            let bucket = match symbol.currency() {
                Currency::Jpy => &mut ranking.domestic,
                Currency::Usd => &mut ranking.foreign,
            };
            if bucket.len() < self.top_n {
                bucket.push(RankedSymbol {
                    symbol,
                    votes: vote.count,
                });
            }
        }

        tracing::debug!(
            %vote_date,
            domestic = ranking.domestic.len(),
            foreign = ranking.foreign.len(),
            "Aggregated votes"
        );
        Ok(ranking)
    }
}
