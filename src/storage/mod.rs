//! Storage module
//!
//! Persistent price cache, vote counts and stock display names

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::pricing::PriceKind;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value could not be decoded
    #[error("Invalid stored value: {0}")]
    InvalidData(String),
    /// A lock guarding the store was poisoned
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Key-value cache of daily closes keyed by (symbol, date), upsert semantics
pub trait PriceCache: Send + Sync {
    /// Cached price, if any
    fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<Decimal>, StorageError>;
    /// Insert or overwrite a price
    fn put(
        &self,
        symbol: &str,
        date: NaiveDate,
        price: Decimal,
        kind: PriceKind,
    ) -> Result<(), StorageError>;
}

/// Resolves a stock code to its display name
pub trait NameResolver: Send + Sync {
    /// Display name, falling back to the code itself
    fn name_of(&self, symbol: &str) -> String;
}
