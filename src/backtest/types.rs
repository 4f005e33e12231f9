//! Backtest errors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that abort a simulation before or at its start
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Start date after end date
    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    /// Initial capital below zero
    #[error("Negative initial capital: {0}")]
    NegativeCapital(Decimal),
    /// Allocation slot above 100 percent
    #[error("Allocation slot {slot} is {percent}%, above 100%")]
    InvalidAllocation { slot: usize, percent: u8 },
    /// No FX rate for the start date, so foreign capital cannot be converted
    #[error("No exchange rate available for start date {0}")]
    InitialFxUnavailable(NaiveDate),
    /// A required run parameter was not supplied
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),
}
