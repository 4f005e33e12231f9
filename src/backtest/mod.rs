//! Backtesting module
//!
//! Day-by-day vote-driven simulation of a JPY and a USD portfolio

mod analytics;
mod book;
mod params;
mod rebalancer;
mod simulator;
mod snapshot;
mod types;

pub use analytics::{BacktestReport, BacktestSummary};
pub use book::CurrencyBook;
pub use params::{AllocationSchedule, SimulationParams};
pub use rebalancer::{
    RebalanceContext, RebalanceOutcome, Rebalancer, TargetPortfolio, TargetPosition,
};
pub use simulator::{SimulationProgress, Simulator};
pub use snapshot::{DailySnapshot, RunStats, SimulationResult};
pub use types::SimulationError;
