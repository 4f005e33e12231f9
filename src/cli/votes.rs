//! Vote commands

use crate::config::Config;
use crate::pricing::Currency;
use crate::storage::NameResolver;
use crate::votes::{trade_date_for, VoteAggregator};
use chrono::NaiveDate;
use clap::Args;

#[derive(Args, Debug)]
pub struct VotesArgs {
    /// Vote date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
}

impl VotesArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;
        let aggregator = VoteAggregator::new(store.clone(), config.simulation.top_n);
        let ranking = aggregator.vote_results(self.date)?;

        match trade_date_for(self.date) {
            Some(trade_date) => println!("Vote date {} trades on {}", self.date, trade_date),
            None => println!("Vote date {} is not a voting day", self.date),
        }

        for currency in [Currency::Jpy, Currency::Usd] {
            println!();
            println!("{} ranking", currency.code());
            let bucket = ranking.bucket(currency);
            if bucket.is_empty() {
                println!("  (no votes)");
            }
            for (slot, ranked) in bucket.iter().enumerate() {
                println!(
                    "  {:>2}. {:<10} {:<24} {:>5} votes",
                    slot + 1,
                    ranked.symbol.code(),
                    store.name_of(ranked.symbol.code()),
                    ranked.votes
                );
            }
        }

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RecordVoteArgs {
    /// Vote date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Stock code, e.g. 7203 or AAPL
    #[arg(long)]
    pub symbol: String,

    /// Number of votes to record
    #[arg(long, default_value = "1")]
    pub count: u32,

    /// Display name stored for the symbol
    #[arg(long)]
    pub name: Option<String>,
}

impl RecordVoteArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            anyhow::bail!("Symbol must not be empty");
        }

        let store = super::open_store(config)?;
        store.record_vote(self.date, symbol, self.count)?;
        if let Some(name) = &self.name {
            store.upsert_name(symbol, name)?;
        }

        tracing::info!(date = %self.date, symbol, count = self.count, "Recorded votes");
        Ok(())
    }
}
