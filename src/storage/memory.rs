//! In-memory store

use super::{NameResolver, PriceCache, StorageError};
use crate::pricing::PriceKind;
use crate::votes::{VoteCount, VoteStore};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    prices: HashMap<(String, NaiveDate), Decimal>,
    /// Votes per date in first-vote order
    votes: HashMap<NaiveDate, Vec<VoteCount>>,
    names: HashMap<String, String>,
    failing_vote_dates: Vec<NaiveDate>,
}

/// Non-persistent store with the same semantics as [`super::SqliteStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Add `count` votes for a symbol on a date
    pub fn record_vote(&self, date: NaiveDate, symbol: &str, count: u32) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let votes = inner.votes.entry(date).or_default();
        match votes.iter_mut().find(|v| v.symbol == symbol) {
            Some(existing) => existing.count += count,
            None => votes.push(VoteCount {
                symbol: symbol.to_string(),
                count,
            }),
        }
        Ok(())
    }

    /// Builder form of [`MemoryStore::record_vote`]
    pub fn with_votes(self, date: NaiveDate, symbol: &str, count: u32) -> Self {
        // a freshly built store cannot be poisoned
        let _ = self.record_vote(date, symbol, count);
        self
    }

    pub fn with_name(self, symbol: &str, name: &str) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.names.insert(symbol.to_string(), name.to_string());
        }
        self
    }

    /// Make vote lookups for `date` fail, to exercise error absorption
    pub fn with_failing_votes(self, date: NaiveDate) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_vote_dates.push(date);
        }
        self
    }

    /// Number of cached prices
    pub fn cached_price_count(&self) -> usize {
        self.lock().map(|inner| inner.prices.len()).unwrap_or(0)
    }
}

impl PriceCache for MemoryStore {
    fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<Decimal>, StorageError> {
        Ok(self.lock()?.prices.get(&(symbol.to_string(), date)).copied())
    }

    fn put(
        &self,
        symbol: &str,
        date: NaiveDate,
        price: Decimal,
        _kind: PriceKind,
    ) -> Result<(), StorageError> {
        self.lock()?.prices.insert((symbol.to_string(), date), price);
        Ok(())
    }
}

impl VoteStore for MemoryStore {
    fn votes_on(&self, date: NaiveDate) -> Result<Vec<VoteCount>, StorageError> {
        let inner = self.lock()?;
        if inner.failing_vote_dates.contains(&date) {
            return Err(StorageError::InvalidData(format!(
                "vote table unavailable for {}",
                date
            )));
        }
        Ok(inner.votes.get(&date).cloned().unwrap_or_default())
    }
}

impl NameResolver for MemoryStore {
    fn name_of(&self, symbol: &str) -> String {
        self.lock()
            .ok()
            .and_then(|inner| inner.names.get(symbol).cloned())
            .unwrap_or_else(|| symbol.to_string())
    }
}
