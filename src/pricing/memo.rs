//! Bounded in-process price memo
//!
//! Sits in front of the persistent price cache. Misses are memoized too, so a
//! symbol that cannot be priced on a date is only looked up once per run.
//! Eviction is least-recently-used.

use chrono::NaiveDate;
use lru::LruCache;
use rust_decimal::Decimal;
use std::num::NonZeroUsize;

type MemoKey = (String, NaiveDate);

/// Bounded (symbol, date) -> price memo
#[derive(Debug)]
pub struct PriceMemo {
    entries: LruCache<MemoKey, Option<Decimal>>,
}

impl PriceMemo {
    /// Create a memo holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a key and mark it recently used.
    /// Outer `None` means unknown, inner `None` a memoized miss.
    pub fn get(&mut self, key: &str, date: NaiveDate) -> Option<Option<Decimal>> {
        self.entries.get(&(key.to_string(), date)).copied()
    }

    pub fn insert(&mut self, key: &str, date: NaiveDate, value: Option<Decimal>) {
        self.entries.put((key.to_string(), date), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_memo_hit_and_unknown() {
        let mut memo = PriceMemo::new(4);
        memo.insert("7203", day(1), Some(dec!(2500)));
        assert_eq!(memo.get("7203", day(1)), Some(Some(dec!(2500))));
        assert_eq!(memo.get("7203", day(2)), None);
    }

    #[test]
    fn test_memoized_miss() {
        let mut memo = PriceMemo::new(4);
        memo.insert("AAPL", day(1), None);
        assert_eq!(memo.get("AAPL", day(1)), Some(None));
    }

    #[test]
    fn test_eviction_least_recently_used() {
        let mut memo = PriceMemo::new(2);
        memo.insert("A", day(1), Some(dec!(1)));
        memo.insert("B", day(1), Some(dec!(2)));
        // reading A makes B the eviction candidate
        assert_eq!(memo.get("A", day(1)), Some(Some(dec!(1))));
        memo.insert("C", day(1), Some(dec!(3)));

        assert_eq!(memo.len(), 2);
        assert_eq!(memo.get("B", day(1)), None);
        assert_eq!(memo.get("A", day(1)), Some(Some(dec!(1))));
        assert_eq!(memo.get("C", day(1)), Some(Some(dec!(3))));
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let mut memo = PriceMemo::new(0);
        memo.insert("A", day(1), None);
        memo.insert("B", day(1), None);
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get("B", day(1)), Some(None));
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let mut memo = PriceMemo::new(2);
        memo.insert("A", day(1), None);
        memo.insert("A", day(1), Some(dec!(10)));
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get("A", day(1)), Some(Some(dec!(10))));
    }
}
