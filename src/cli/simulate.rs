//! Simulate command implementation

use crate::backtest::{BacktestReport, BacktestSummary, Rebalancer, SimulationParams, Simulator};
use crate::config::{Config, OutputFormat};
use crate::data::ResultWriter;
use crate::pricing::{PriceResolver, ResolverConfig};
use crate::risk::{yearly_summary, MonthlySummaryRow};
use crate::votes::VoteAggregator;
use chrono::{Datelike, NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// First simulated day (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last simulated day (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Domestic principal in JPY
    #[arg(long)]
    pub jpy: Option<Decimal>,

    /// Foreign principal in JPY
    #[arg(long)]
    pub usd: Option<Decimal>,

    /// Output directory for results
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Console output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Also write snapshots and trades as Parquet
    #[arg(long)]
    pub parquet: bool,

    /// Price from the cache only, without network access
    #[arg(long)]
    pub offline: bool,
}

impl SimulateArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut simulation = config.simulation.clone();
        if let Some(start) = self.start {
            simulation.start_date = Some(start);
        }
        if let Some(end) = self.end {
            simulation.end_date = Some(end);
        }
        if let Some(jpy) = self.jpy {
            simulation.initial_jpy = jpy;
        }
        if let Some(usd) = self.usd {
            simulation.initial_usd = usd;
        }

        let params = SimulationParams::from_config(&simulation)?;
        for warning in params.allocation_warnings() {
            tracing::warn!("{}", warning);
        }

        let store = super::open_store(config)?;
        let provider = super::build_provider(config, self.offline)?;
        let resolver = PriceResolver::new(provider, store.clone(), ResolverConfig::from_config(config));
        let aggregator = VoteAggregator::new(store.clone(), simulation.top_n);

        let mut last_decile = 0;
        let mut simulator = Simulator::new(resolver, aggregator, store, Rebalancer::from_config(config))
            .with_prefetch(config.provider.prefetch && !self.offline)
            .with_progress(move |progress| {
                let decile = (progress.fraction() * 10.0) as u32;
                if decile > last_decile {
                    last_decile = decile;
                    tracing::debug!(date = %progress.date, percent = decile * 10, "Progress");
                }
            });

        let started = Utc::now();
        let result = simulator.run(&params).await?;
        let summary = BacktestSummary::from_result(&result, simulation.risk_free_rate);
        summary.publish_metrics();
        let report = BacktestReport::from_result(&result);

        match self.format.unwrap_or(config.export.format) {
            OutputFormat::Table => {
                println!("{}", summary.format_table());
                for year in params.start.year()..=params.end.year() {
                    println!("{}", format_yearly(year, &yearly_summary(&result.snapshots, year)));
                }
                println!("{}", report.format_months());
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        }

        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.export.output_dir.clone());
        let writer = ResultWriter::new(output_dir);
        let written = writer.export(
            &result,
            &summary,
            &report,
            started,
            self.parquet || config.export.parquet,
        )?;
        for path in written {
            tracing::info!(path = ?path, "Wrote result file");
        }

        Ok(())
    }
}

fn format_yearly(year: i32, rows: &[MonthlySummaryRow]) -> String {
    let mut out = format!("{} MONTHLY P&L\n", year);
    out.push_str("───────────────────────────────────────────────────────\n");
    for row in rows {
        match &row.pnl {
            Some(pnl) => out.push_str(&format!(
                "{:>2}:  {:>+14.0} JPY  {:>+8.2}%\n",
                row.month, pnl.amount, pnl.rate_pct
            )),
            None => out.push_str(&format!("{:>2}:  {:>14}\n", row.month, "-")),
        }
    }
    out
}
