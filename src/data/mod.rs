//! Result export module
//!
//! Writes snapshots and trades to Parquet and JSON for downstream tooling

mod parquet;

pub use parquet::{snapshot_schema, trade_schema, ParquetReader, ResultWriter};
