//! Risk metrics
//!
//! Computed in `f64`: the inputs are already-rounded JPY values and the
//! outputs are statistics, not money.

use crate::backtest::DailySnapshot;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Daily returns are clamped to +/- this fraction
pub const DAILY_RETURN_CLAMP: f64 = 0.5;

const TOTAL_RETURN_FLOOR: f64 = -0.9;
const TOTAL_RETURN_CEILING: f64 = 10.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Summary risk statistics. Percent fields are already multiplied by 100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskMetrics {
    /// Total return over the run, clamped to [-90%, 1000%]
    pub total_return_pct: f64,
    /// Compound annual return
    pub annual_return_pct: f64,
    /// Population standard deviation of daily returns, annualized
    pub annual_volatility_pct: f64,
    /// `(annual_return - risk_free) / annual_volatility`, zero without volatility
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline
    pub max_drawdown_pct: f64,
    /// Snapshots in the run, one per trading day
    pub days: i64,
    /// Trades executed
    pub total_trades: usize,
}

impl RiskMetrics {
    /// Statistics over `snapshots`; `None` with fewer than two usable values
    pub fn compute(snapshots: &[DailySnapshot], total_trades: usize, risk_free_rate: f64) -> Option<Self> {
        if snapshots.len() < 2 {
            return None;
        }
        let values: Vec<f64> = snapshots
            .iter()
            .map(|s| s.total_value.to_f64().unwrap_or(0.0))
            .collect();

        let daily_returns: Vec<f64> = values
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| ((w[1] - w[0]) / w[0]).clamp(-DAILY_RETURN_CLAMP, DAILY_RETURN_CLAMP))
            .collect();
        if daily_returns.is_empty() {
            return None;
        }

        let first = values[0];
        let last = values[values.len() - 1];
        let total_return = if first > 0.0 {
            ((last - first) / first).clamp(TOTAL_RETURN_FLOOR, TOTAL_RETURN_CEILING)
        } else {
            0.0
        };

        let days = snapshots.len() as i64;
        let annual_return = (1.0 + total_return).powf(DAYS_PER_YEAR / days as f64) - 1.0;
        let annual_return = if annual_return.is_finite() {
            annual_return
        } else if total_return > 0.0 {
            TOTAL_RETURN_CEILING
        } else {
            TOTAL_RETURN_FLOOR
        };

        let annual_volatility = population_std(&daily_returns) * DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = if annual_volatility > 0.0 {
            (annual_return - risk_free_rate) / annual_volatility
        } else {
            0.0
        };

        Some(Self {
            total_return_pct: total_return * 100.0,
            annual_return_pct: annual_return * 100.0,
            annual_volatility_pct: annual_volatility * 100.0,
            sharpe_ratio,
            max_drawdown_pct: max_drawdown(&values) * 100.0,
            days,
            total_trades,
        })
    }
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Largest `(peak - value) / peak` over the series, as a fraction
fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &value in values {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst
}
