//! SQLite-backed store
//!
//! Tables mirror the voting application's schema: `vote` rows are individual
//! ballots, `stock_master` holds display names and `price_cache` memoizes
//! provider closes permanently.

use super::{NameResolver, PriceCache, StorageError};
use crate::pricing::PriceKind;
use crate::votes::{VoteCount, VoteStore};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS price_cache (
    stock_code TEXT NOT NULL,
    date TEXT NOT NULL,
    price TEXT NOT NULL,
    currency TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (stock_code, date)
);
CREATE TABLE IF NOT EXISTS vote (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vote_date TEXT NOT NULL,
    stock_code TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vote_date_stock_code ON vote (vote_date, stock_code);
CREATE TABLE IF NOT EXISTS stock_master (
    stock_code TEXT PRIMARY KEY,
    stock_name TEXT NOT NULL
);
"#;

/// SQLite store implementing the price cache, vote store and name resolver.
///
/// Every call locks the connection mutex and blocks on rusqlite. The simulator
/// calls it from its sequential day loop; callers sharing one store across
/// concurrent tasks should go through `tokio::task::spawn_blocking`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::InvalidData(e.to_string()))?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Append `count` ballots for a symbol on a vote date
    pub fn record_vote(&self, date: NaiveDate, symbol: &str, count: u32) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        for _ in 0..count {
            tx.execute(
                "INSERT INTO vote (vote_date, stock_code, created_at) VALUES (?1, ?2, ?3)",
                params![date.to_string(), symbol, created_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or rename a stock master entry
    pub fn upsert_name(&self, symbol: &str, name: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO stock_master (stock_code, stock_name) VALUES (?1, ?2)
             ON CONFLICT(stock_code) DO UPDATE SET stock_name = excluded.stock_name",
            params![symbol, name],
        )?;
        Ok(())
    }

    /// Number of cached prices
    pub fn cached_price_count(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM price_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl PriceCache for SqliteStore {
    fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<Decimal>, StorageError> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT price FROM price_cache WHERE stock_code = ?1 AND date = ?2",
                params![symbol, date.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| {
            Decimal::from_str(&s)
                .map_err(|e| StorageError::InvalidData(format!("price {:?}: {}", s, e)))
        })
        .transpose()
    }

    fn put(
        &self,
        symbol: &str,
        date: NaiveDate,
        price: Decimal,
        kind: PriceKind,
    ) -> Result<(), StorageError> {
        let updated_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.conn()?.execute(
            "INSERT INTO price_cache (stock_code, date, price, currency, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(stock_code, date) DO UPDATE SET
                price = excluded.price,
                currency = excluded.currency,
                updated_at = excluded.updated_at",
            params![
                symbol,
                date.to_string(),
                price.to_string(),
                kind.as_str(),
                updated_at
            ],
        )?;
        Ok(())
    }
}

impl VoteStore for SqliteStore {
    fn votes_on(&self, date: NaiveDate) -> Result<Vec<VoteCount>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT stock_code, COUNT(*) AS vote_count
             FROM vote
             WHERE vote_date = ?1
             GROUP BY stock_code
             ORDER BY vote_count DESC, MIN(id) ASC",
        )?;
        let rows = stmt.query_map(params![date.to_string()], |row| {
            Ok(VoteCount {
                symbol: row.get(0)?,
                count: row.get(1)?,
            })
        })?;

        let mut votes = Vec::new();
        for row in rows {
            votes.push(row?);
        }
        Ok(votes)
    }
}

impl NameResolver for SqliteStore {
    fn name_of(&self, symbol: &str) -> String {
        let lookup = self.conn().and_then(|conn| {
            conn.query_row(
                "SELECT stock_name FROM stock_master WHERE stock_code = ?1",
                params![symbol],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(StorageError::from)
        });

        match lookup {
            Ok(Some(name)) => name,
            Ok(None) => symbol.to_string(),
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Name lookup failed");
                symbol.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::Currency;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn test_price_cache_miss_then_hit() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("7203", day(1)).unwrap(), None);

        store
            .put("7203", day(1), dec!(2550.5), PriceKind::Equity(Currency::Jpy))
            .unwrap();
        assert_eq!(store.get("7203", day(1)).unwrap(), Some(dec!(2550.5)));
        assert_eq!(store.get("7203", day(2)).unwrap(), None);
    }

    #[test]
    fn test_price_cache_upsert_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("USDJPY=X", day(1), dec!(150.1), PriceKind::Fx).unwrap();
        store.put("USDJPY=X", day(1), dec!(150.2), PriceKind::Fx).unwrap();

        assert_eq!(store.get("USDJPY=X", day(1)).unwrap(), Some(dec!(150.2)));
        assert_eq!(store.cached_price_count().unwrap(), 1);
    }

    #[test]
    fn test_votes_grouped_and_ranked() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.record_vote(day(6), "AAPL", 2).unwrap();
        store.record_vote(day(6), "7203", 3).unwrap();
        store.record_vote(day(6), "NVDA", 2).unwrap();
        store.record_vote(day(9), "9984", 1).unwrap();

        let votes = store.votes_on(day(6)).unwrap();
        let ranked: Vec<(&str, u32)> = votes.iter().map(|v| (v.symbol.as_str(), v.count)).collect();
        // ties keep first-vote order
        assert_eq!(ranked, vec![("7203", 3), ("AAPL", 2), ("NVDA", 2)]);
    }

    #[test]
    fn test_votes_on_empty_date() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.votes_on(day(1)).unwrap().is_empty());
    }

    #[test]
    fn test_name_of_falls_back_to_code() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_name("7203", "Toyota Motor").unwrap();
        assert_eq!(store.name_of("7203"), "Toyota Motor");
        assert_eq!(store.name_of("AAPL"), "AAPL");

        store.upsert_name("7203", "トヨタ自動車").unwrap();
        assert_eq!(store.name_of("7203"), "トヨタ自動車");
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("AAPL", day(1), dec!(170), PriceKind::Equity(Currency::Usd)).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get("AAPL", day(1)).unwrap(), Some(dec!(170)));
    }

    #[tokio::test]
    async fn test_shared_store_from_blocking_tasks() {
        let store = std::sync::Arc::new(SqliteStore::open_in_memory().unwrap());

        let mut handles = Vec::new();
        for d in 1..=8u32 {
            let store = store.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                store.put("USDJPY=X", day(d), Decimal::from(140 + d), PriceKind::Fx)
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.cached_price_count().unwrap(), 8);
        assert_eq!(store.get("USDJPY=X", day(5)).unwrap(), Some(dec!(145)));
    }
}
