//! Weekly risk-free series.
//!
//! The deposit rate is quoted annualised; the weekly rate is the simple
//! interest share `rate / 52`.

use crate::error::{FactorError, Result};
use serde::{Deserialize, Serialize};

/// Periods per year used to de-annualise the deposit rate.
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Which observation of the rate applies to a return week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFreeAlignment {
    /// Week `t` earns the rate observed at the end of week `t - 1` (shift, then divide).
    Lagged,
    /// Week `t` uses the rate observed at the end of week `t`.
    Contemporaneous,
}

/// De-annualise a rate series and align it with a return series.
///
/// The output has `rates.len() - 1` elements so that it lines up with
/// returns derived from the same dates.
///
/// # Errors
///
/// Returns an error if fewer than two observations are given.
pub fn weekly_risk_free(
    rates: &[f64],
    alignment: RiskFreeAlignment,
    periods_per_year: f64,
) -> Result<Vec<f64>> {
    if rates.len() < 2 {
        return Err(FactorError::InsufficientData {
            required: 2,
            actual: rates.len(),
        });
    }
    let aligned = match alignment {
        RiskFreeAlignment::Lagged => &rates[..rates.len() - 1],
        RiskFreeAlignment::Contemporaneous => &rates[1..],
    };
    Ok(aligned.iter().map(|r| r / periods_per_year).collect())
}
