//! vote-backtest: Vote-driven JPY/USD portfolio backtester
//!
//! This library provides the core components for:
//! - Daily close and exchange rate resolution with a two-tier cache
//! - Vote aggregation into domestic and foreign rankings
//! - Cost-aware rebalancing of two currency books
//! - Daily valuation, cost-basis accounting and P&L breakdown
//! - Risk metrics and period reporting
//! - Result export to Parquet and JSON
//! - Logging and metrics

pub mod accounting;
pub mod backtest;
pub mod cli;
pub mod config;
pub mod data;
pub mod execution;
pub mod pricing;
pub mod risk;
pub mod storage;
pub mod telemetry;
pub mod votes;
