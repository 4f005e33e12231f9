use clap::Parser;
use vote_backtest::cli::{Cli, Commands};
use vote_backtest::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _telemetry = vote_backtest::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Simulate(args) => {
            tracing::info!("Starting simulation");
            args.execute(&config).await?;
        }
        Commands::Votes(args) => args.execute(&config).await?,
        Commands::RecordVote(args) => args.execute(&config).await?,
        Commands::Price(args) => args.execute(&config).await?,
        Commands::Config => {
            println!("# Effective configuration ({})", cli.config);
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
