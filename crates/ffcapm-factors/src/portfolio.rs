//! Weighted portfolio returns.
//!
//! Weights are fixed at formation and applied unchanged to every week of
//! the holding period (buy-and-hold weights, no weekly rebalancing).

use crate::{
    error::{FactorError, Result},
    returns::ReturnTable,
};
use chrono::NaiveDate;
use ffcapm_data::SnapshotTable;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// How portfolio members are weighted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// `1 / N` per member
    #[default]
    Equal,
    /// Member market value over total market value at the snapshot date
    MarketCap,
}

/// Normalised weights of a named member list.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioWeights {
    name: String,
    members: Vec<String>,
    weights: Array1<f64>,
}

impl PortfolioWeights {
    /// Equal weights.
    ///
    /// # Errors
    ///
    /// Returns [`FactorError::EmptyPortfolio`] for an empty member list.
    pub fn equal(name: impl Into<String>, members: Vec<String>) -> Result<Self> {
        let raw = vec![1.0; members.len()];
        Self::from_values(name, members, raw)
    }

    /// Market value weights read from a snapshot at `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if a member has no snapshot value, a value is not
    /// finite, or the total is not positive.
    pub fn market_cap(
        name: impl Into<String>,
        members: Vec<String>,
        snapshot: &SnapshotTable,
        date: NaiveDate,
    ) -> Result<Self> {
        let raw = snapshot.values_at(&members, date)?;
        if let Some(pos) = raw.iter().position(|v| !v.is_finite()) {
            return Err(FactorError::NonFiniteSnapshot {
                snapshot: snapshot.name().to_string(),
                instrument: members[pos].clone(),
            });
        }
        Self::from_values(name, members, raw)
    }

    /// Normalise raw weights so they sum to one.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, lengths differ or the total is not positive.
    pub fn from_values(
        name: impl Into<String>,
        members: Vec<String>,
        raw: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if members.is_empty() {
            return Err(FactorError::EmptyPortfolio(name));
        }
        if raw.len() != members.len() {
            return Err(FactorError::LengthMismatch {
                what: format!("weights of '{name}'"),
                expected: members.len(),
                actual: raw.len(),
            });
        }
        let weights = Array1::from(raw);
        let total = weights.sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(FactorError::NonPositiveWeight {
                portfolio: name,
                total,
            });
        }
        Ok(Self {
            name,
            members,
            weights: weights / total,
        })
    }

    /// Portfolio name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in weight order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Normalised weights.
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// Members paired with their weights.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.members
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the portfolio has no members. Never true for a constructed value.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Weighted return of the portfolio for every week of `weeks`.
///
/// # Errors
///
/// Fails if a member has no return series or the range exceeds the table.
pub fn weighted_returns(
    returns: &ReturnTable,
    weights: &PortfolioWeights,
    weeks: Range<usize>,
) -> Result<Vec<f64>> {
    let matrix = returns.matrix(weights.members(), weeks)?;
    Ok(matrix.dot(&weights.weights).to_vec())
}

/// Subtract a risk-free series, week by week.
///
/// # Errors
///
/// Returns an error if the two series differ in length.
pub fn excess_returns(returns: &[f64], risk_free: &[f64]) -> Result<Vec<f64>> {
    if returns.len() != risk_free.len() {
        return Err(FactorError::LengthMismatch {
            what: "risk-free series".to_string(),
            expected: returns.len(),
            actual: risk_free.len(),
        });
    }
    Ok(returns.iter().zip(risk_free).map(|(r, f)| r - f).collect())
}
