//! Price command implementation

use crate::config::Config;
use crate::pricing::{PriceResolver, ResolverConfig, Symbol};
use chrono::NaiveDate;
use clap::Args;

#[derive(Args, Debug)]
pub struct PriceArgs {
    /// Stock code, or the configured FX ticker for the exchange rate
    #[arg(long)]
    pub symbol: String,

    /// Date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Use the cache only
    #[arg(long)]
    pub offline: bool,
}

impl PriceArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;
        let provider = super::build_provider(config, self.offline)?;
        let mut resolver = PriceResolver::new(provider, store, ResolverConfig::from_config(config));

        let price = if self.symbol == config.provider.fx_symbol {
            resolver.resolve_fx_rate(self.date).await
        } else {
            let symbol = Symbol::parse(&self.symbol)
                .ok_or_else(|| anyhow::anyhow!("Invalid symbol: {:?}", self.symbol))?;
            resolver.resolve_price(&symbol, self.date).await
        };

        let stats = resolver.stats();
        tracing::debug!(
            cache_hits = stats.cache_hits,
            provider_fetches = stats.provider_fetches,
            "Resolver stats"
        );

        match price {
            Some(price) => println!("{} {} {}", self.symbol, self.date, price),
            None => println!("{} {} no price available", self.symbol, self.date),
        }
        Ok(())
    }
}
