//! Simulation parameters

use super::SimulationError;
use crate::config::SimulationConfig;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ten ranked slots, each a whole percentage of investable capital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSchedule([u8; 10]);

impl AllocationSchedule {
    /// Reject any slot above 100%. Sums other than 100 are accepted as given.
    pub fn new(slots: [u8; 10]) -> Result<Self, SimulationError> {
        if let Some((slot, percent)) = slots.iter().enumerate().find(|(_, p)| **p > 100) {
            return Err(SimulationError::InvalidAllocation {
                slot,
                percent: *percent,
            });
        }
        Ok(Self(slots))
    }

    /// Fraction of capital for a ranked slot; zero past the tenth slot
    pub fn weight(&self, slot: usize) -> Decimal {
        self.0
            .get(slot)
            .map(|p| Decimal::from(*p) / Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of all slots in percent
    pub fn total(&self) -> u32 {
        self.0.iter().map(|p| u32::from(*p)).sum()
    }

    pub fn slots(&self) -> &[u8; 10] {
        &self.0
    }
}

/// Inputs of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    /// First calendar day
    pub start: NaiveDate,
    /// Last calendar day, inclusive
    pub end: NaiveDate,
    /// Domestic principal in JPY
    pub initial_jpy: Decimal,
    /// Foreign principal, expressed in JPY
    pub initial_usd: Decimal,
    pub jpy_allocation: AllocationSchedule,
    pub usd_allocation: AllocationSchedule,
}

impl SimulationParams {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        initial_jpy: Decimal,
        initial_usd: Decimal,
        jpy_allocation: [u8; 10],
        usd_allocation: [u8; 10],
    ) -> Result<Self, SimulationError> {
        let params = Self {
            start,
            end,
            initial_jpy,
            initial_usd,
            jpy_allocation: AllocationSchedule::new(jpy_allocation)?,
            usd_allocation: AllocationSchedule::new(usd_allocation)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Build from the `[simulation]` config section; both dates are required
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let start = config
            .start_date
            .ok_or(SimulationError::MissingParameter("start_date"))?;
        let end = config
            .end_date
            .ok_or(SimulationError::MissingParameter("end_date"))?;
        Self::new(
            start,
            end,
            config.initial_jpy,
            config.initial_usd,
            config.jpy_allocation,
            config.usd_allocation,
        )
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.start > self.end {
            return Err(SimulationError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        for capital in [self.initial_jpy, self.initial_usd] {
            if capital < Decimal::ZERO {
                return Err(SimulationError::NegativeCapital(capital));
            }
        }
        Ok(())
    }

    /// Calendar days in the run, inclusive
    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Human-readable warnings for schedules that do not sum to 100%
    pub fn allocation_warnings(&self) -> Vec<String> {
        [("JPY", &self.jpy_allocation), ("USD", &self.usd_allocation)]
            .into_iter()
            .filter(|(_, schedule)| schedule.total() != 100)
            .map(|(bucket, schedule)| {
                format!(
                    "{} allocation sums to {}%, applied as given",
                    bucket,
                    schedule.total()
                )
            })
            .collect()
    }
}
