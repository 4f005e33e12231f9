//! Configuration types for vote-backtest

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default 10-slot allocation schedule (percent of capital per ranked slot)
pub const DEFAULT_ALLOCATION: [u8; 10] = [25, 20, 15, 10, 5, 5, 5, 5, 5, 5];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub costs: CostConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Backtest run parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// First simulated calendar day
    pub start_date: Option<NaiveDate>,
    /// Last simulated calendar day (inclusive)
    pub end_date: Option<NaiveDate>,
    /// Domestic principal in JPY
    #[serde(default = "default_initial_jpy")]
    pub initial_jpy: Decimal,
    /// Foreign principal, expressed in JPY and converted at the start date's rate
    #[serde(default = "default_initial_usd")]
    pub initial_usd: Decimal,
    /// Domestic allocation schedule in percent
    #[serde(default = "default_allocation")]
    pub jpy_allocation: [u8; 10],
    /// Foreign allocation schedule in percent
    #[serde(default = "default_allocation")]
    pub usd_allocation: [u8; 10],
    /// Number of forced-sale correction passes when sizing targets
    #[serde(default = "default_correction_passes")]
    pub correction_passes: u32,
    /// Annual risk-free rate used by the Sharpe ratio
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Fraction of cash usable when a buy has to be shrunk
    #[serde(default = "default_cash_safety_margin")]
    pub cash_safety_margin: Decimal,
    /// Ranked symbols kept per currency bucket
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_initial_jpy() -> Decimal {
    dec!(1000000)
}
fn default_initial_usd() -> Decimal {
    dec!(1000000)
}
fn default_allocation() -> [u8; 10] {
    DEFAULT_ALLOCATION
}
fn default_correction_passes() -> u32 {
    1
}
fn default_risk_free_rate() -> f64 {
    0.02
}
fn default_cash_safety_margin() -> Decimal {
    dec!(0.99)
}
fn default_top_n() -> usize {
    10
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            initial_jpy: default_initial_jpy(),
            initial_usd: default_initial_usd(),
            jpy_allocation: DEFAULT_ALLOCATION,
            usd_allocation: DEFAULT_ALLOCATION,
            correction_passes: 1,
            risk_free_rate: 0.02,
            cash_safety_margin: dec!(0.99),
            top_n: 10,
        }
    }
}

/// Trading cost rates, applied to trade notional
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CostConfig {
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: Decimal,
    #[serde(default = "default_spread_rate")]
    pub spread_rate: Decimal,
}

fn default_commission_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}
fn default_slippage_rate() -> Decimal {
    Decimal::new(5, 4) // 0.05%
}
fn default_spread_rate() -> Decimal {
    Decimal::new(2, 4) // 0.02%
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(1, 3),
            slippage_rate: Decimal::new(5, 4),
            spread_rate: Decimal::new(2, 4),
        }
    }
}

/// Market data provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Chart API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Calendar days searched on each side of the target date
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Largest plausible share price
    #[serde(default = "default_max_price")]
    pub max_price: Decimal,
    /// Largest plausible JPY per USD rate
    #[serde(default = "default_max_fx_rate")]
    pub max_fx_rate: Decimal,
    /// Provider ticker of the USD/JPY rate
    #[serde(default = "default_fx_symbol")]
    pub fx_symbol: String,
    /// Exchange suffix appended to domestic codes (e.g. "7203" -> "7203.T")
    #[serde(default = "default_domestic_suffix")]
    pub domestic_suffix: String,
    /// Fetch each series once over the remaining range instead of per day
    #[serde(default = "default_true")]
    pub prefetch: bool,
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_lookback_days() -> i64 {
    3
}
fn default_max_price() -> Decimal {
    dec!(1000000)
}
fn default_max_fx_rate() -> Decimal {
    dec!(1000)
}
fn default_fx_symbol() -> String {
    "USDJPY=X".to_string()
}
fn default_domestic_suffix() -> String {
    ".T".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 10,
            lookback_days: 3,
            max_price: default_max_price(),
            max_fx_rate: default_max_fx_rate(),
            fx_symbol: default_fx_symbol(),
            domestic_suffix: default_domestic_suffix(),
            prefetch: true,
        }
    }
}

/// Persistent store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database holding votes, names and the price cache
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Entries kept in the in-process price memo
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: usize,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/backtest.db")
}
fn default_memo_capacity() -> usize {
    10_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            memo_capacity: 10_000,
        }
    }
}

/// Result export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Write snapshots and trades as Parquet files
    #[serde(default)]
    pub parquet: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: OutputFormat::Table,
            parquet: false,
        }
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
