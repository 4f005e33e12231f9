//! CLI interface for vote-backtest
//!
//! Provides subcommands for:
//! - `simulate`: Run a backtest over a date range
//! - `votes`: Show the ranking for a vote date
//! - `record-vote`: Append vote events to the store
//! - `price`: Resolve one close through the cache
//! - `config`: Show the effective configuration

mod price;
mod simulate;
mod votes;

pub use price::PriceArgs;
pub use simulate::SimulateArgs;
pub use votes::{RecordVoteArgs, VotesArgs};

use crate::config::Config;
use crate::pricing::{MarketDataProvider, StaticProvider, YahooClient, YahooConfig};
use crate::storage::SqliteStore;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "vote-backtest")]
#[command(about = "Backtest a vote-driven JPY/USD stock portfolio")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a backtest
    Simulate(SimulateArgs),
    /// Show the domestic and foreign ranking for a vote date
    Votes(VotesArgs),
    /// Record vote events
    RecordVote(RecordVoteArgs),
    /// Resolve a daily close
    Price(PriceArgs),
    /// Show configuration
    Config,
}

/// Open the configured SQLite store
pub(crate) fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.storage.database_path)?;
    tracing::debug!(path = ?config.storage.database_path, "Opened store");
    Ok(Arc::new(store))
}

/// Market data provider; offline runs price from the cache only
pub(crate) fn build_provider(
    config: &Config,
    offline: bool,
) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    if offline {
        tracing::info!("Offline mode, prices served from cache only");
        return Ok(Arc::new(StaticProvider::empty()));
    }
    let client = YahooClient::with_config(YahooConfig::from(&config.provider))?;
    Ok(Arc::new(client))
}
